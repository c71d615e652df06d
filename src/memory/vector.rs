//! Approximate-match memory tier with graceful degradation
//!
//! Primary backend is a Qdrant collection fed by an embedding client. When
//! the backend is unreachable (connectivity probe at init, embedding errors,
//! or a runtime store/search failure) the store drops into fallback mode: an
//! in-memory capped list searched by substring / token overlap. A runtime
//! failure self-heals by switching to fallback and retrying the operation
//! once instead of propagating the error.

use crate::errors::{AgentError, Result};
use crate::memory::embedding::EmbeddingClient;
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        vectors_config::Config, with_payload_selector::SelectorOptions, CreateCollection, Distance,
        SearchPoints, PointStruct, Value as QdrantValue, VectorParams, VectorsConfig,
        WithPayloadSelector,
    },
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// Maximum entries retained in fallback mode (FIFO eviction)
pub const FALLBACK_CAPACITY: usize = 50;

/// Embedding dimensionality the collection is created with
const EMBEDDING_DIM: u64 = 768;

/// One stored memory: rendered content plus string metadata
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub content: String,
    pub metadata: HashMap<String, String>,
}

/// Operating statistics for health reporting
#[derive(Debug, Clone)]
pub struct VectorMemoryStats {
    pub mode: &'static str,
    pub entries: usize,
}

#[derive(Default)]
struct FallbackState {
    active: bool,
    entries: VecDeque<VectorRecord>,
}

/// Vector store with a degraded-but-available fallback path
pub struct VectorMemory {
    collection: String,
    embedder: Option<Arc<dyn EmbeddingClient>>,
    qdrant: Option<QdrantClient>,
    state: Mutex<FallbackState>,
}

impl VectorMemory {
    /// Connect to Qdrant and probe the backend
    ///
    /// Never fails: any problem reaching Qdrant or the embedding backend
    /// yields a store that starts in fallback mode.
    pub async fn connect(
        collection: impl Into<String>,
        embedder: Arc<dyn EmbeddingClient>,
        qdrant_url: &str,
    ) -> Self {
        let collection = collection.into();

        let qdrant = match Self::probe_backend(&collection, embedder.as_ref(), qdrant_url).await {
            Ok(client) => {
                debug!(collection = %collection, "Vector backend connected");
                Some(client)
            }
            Err(e) => {
                warn!(collection = %collection, error = %e,
                      "Vector backend unavailable, using fallback mode");
                None
            }
        };

        let fallback_active = qdrant.is_none();
        Self {
            collection,
            embedder: Some(embedder),
            qdrant,
            state: Mutex::new(FallbackState {
                active: fallback_active,
                entries: VecDeque::new(),
            }),
        }
    }

    /// Build a store that only ever uses the in-memory fallback list
    pub fn fallback_only(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            embedder: None,
            qdrant: None,
            state: Mutex::new(FallbackState {
                active: true,
                entries: VecDeque::new(),
            }),
        }
    }

    /// Store that believes its backend is live but whose backend calls all
    /// fail; reaches the runtime degradation branch without a real Qdrant
    #[cfg(test)]
    fn broken_backend(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            embedder: None,
            qdrant: None,
            state: Mutex::new(FallbackState::default()),
        }
    }

    async fn probe_backend(
        collection: &str,
        embedder: &dyn EmbeddingClient,
        qdrant_url: &str,
    ) -> Result<QdrantClient> {
        if !embedder.is_available().await {
            return Err(AgentError::EmbeddingError(
                "Embedding backend unreachable".to_string(),
            ));
        }

        let client = QdrantClient::from_url(qdrant_url)
            .build()
            .map_err(|e| AgentError::VectorStoreError(format!("Failed to create client: {}", e)))?;

        Self::ensure_collection(&client, collection).await?;

        // Connectivity probe: embed and search once before trusting the tier
        let probe = embedder.embed("test").await?;
        Self::search_backend(&client, collection, &probe, 1).await?;

        Ok(client)
    }

    async fn ensure_collection(client: &QdrantClient, collection: &str) -> Result<()> {
        let listed = client
            .list_collections()
            .await
            .map_err(|e| AgentError::VectorStoreError(format!("Failed to list collections: {}", e)))?;

        let exists = listed.collections.iter().any(|c| c.name == collection);
        if !exists {
            client
                .create_collection(&CreateCollection {
                    collection_name: collection.to_string(),
                    vectors_config: Some(VectorsConfig {
                        config: Some(Config::Params(VectorParams {
                            size: EMBEDDING_DIM,
                            distance: Distance::Cosine.into(),
                            ..Default::default()
                        })),
                    }),
                    ..Default::default()
                })
                .await
                .map_err(|e| {
                    AgentError::VectorStoreError(format!(
                        "Failed to create collection {}: {}",
                        collection, e
                    ))
                })?;
        }

        Ok(())
    }

    /// Store a record; self-heals into fallback mode on backend failure
    pub async fn store(&self, record: VectorRecord) {
        {
            let state = self.state.lock().await;
            if state.active {
                drop(state);
                self.store_fallback(record).await;
                return;
            }
        }

        if let Err(e) = self.store_backend(&record).await {
            warn!(collection = %self.collection, error = %e,
                  "Vector storage failed, switching to fallback mode");
            self.enter_fallback().await;
            self.store_fallback(record).await;
        }
    }

    /// Retrieve up to `top_k` approximate matches for `query`
    ///
    /// Backend failures switch to fallback and retry once; the caller never
    /// sees an error, only possibly-degraded results.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<VectorRecord> {
        {
            let state = self.state.lock().await;
            if state.active {
                return Self::search_fallback(&state.entries, query, top_k);
            }
        }

        match self.search_via_backend(query, top_k).await {
            Ok(records) => records,
            Err(e) => {
                warn!(collection = %self.collection, error = %e,
                      "Vector retrieval failed, switching to fallback mode");
                self.enter_fallback().await;
                let state = self.state.lock().await;
                Self::search_fallback(&state.entries, query, top_k)
            }
        }
    }

    /// Force the store into fallback mode (used when init of the wider
    /// memory subsystem fails)
    pub async fn force_fallback(&self) {
        self.enter_fallback().await;
    }

    pub async fn is_fallback(&self) -> bool {
        self.state.lock().await.active
    }

    pub async fn stats(&self) -> VectorMemoryStats {
        let state = self.state.lock().await;
        if state.active {
            VectorMemoryStats {
                mode: "fallback",
                entries: state.entries.len(),
            }
        } else {
            VectorMemoryStats {
                mode: "qdrant",
                entries: self.backend_count().await,
            }
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn enter_fallback(&self) {
        self.state.lock().await.active = true;
    }

    async fn store_fallback(&self, record: VectorRecord) {
        let mut state = self.state.lock().await;
        if state.entries.len() >= FALLBACK_CAPACITY {
            state.entries.pop_front();
        }
        state.entries.push_back(record);
    }

    /// Substring or token-overlap match; the **last** `top_k` hits win,
    /// keeping the most recent memories
    fn search_fallback(
        entries: &VecDeque<VectorRecord>,
        query: &str,
        top_k: usize,
    ) -> Vec<VectorRecord> {
        let query_lc = query.to_lowercase();
        let tokens: Vec<&str> = query_lc.split_whitespace().collect();

        let hits: Vec<&VectorRecord> = entries
            .iter()
            .filter(|record| {
                let content_lc = record.content.to_lowercase();
                content_lc.contains(&query_lc)
                    || tokens.iter().any(|token| content_lc.contains(token))
            })
            .collect();

        let start = hits.len().saturating_sub(top_k);
        hits[start..].iter().map(|r| (*r).clone()).collect()
    }

    async fn store_backend(&self, record: &VectorRecord) -> Result<()> {
        let embedder = self.require_embedder()?;
        let qdrant = self.require_qdrant()?;

        let embedding = embedder.embed(&record.content).await?;

        let mut payload: HashMap<String, QdrantValue> = HashMap::new();
        for (key, value) in &record.metadata {
            payload.insert(key.clone(), QdrantValue::from(value.clone()));
        }
        payload.insert(
            "document".to_string(),
            QdrantValue::from(record.content.clone()),
        );

        let point = PointStruct::new(Uuid::new_v4().to_string(), embedding, payload);
        qdrant
            .upsert_points_blocking(&self.collection, None, vec![point], None)
            .await
            .map_err(|e| AgentError::VectorStoreError(format!("Failed to upsert point: {}", e)))?;

        Ok(())
    }

    async fn search_via_backend(&self, query: &str, top_k: usize) -> Result<Vec<VectorRecord>> {
        let embedder = self.require_embedder()?;
        let qdrant = self.require_qdrant()?;

        let embedding = embedder.embed(query).await?;
        Self::search_backend(qdrant, &self.collection, &embedding, top_k).await
    }

    async fn search_backend(
        client: &QdrantClient,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorRecord>> {
        let response = client
            .search_points(&SearchPoints {
                collection_name: collection.to_string(),
                vector: embedding.to_vec(),
                limit: top_k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| AgentError::VectorStoreError(format!("Failed to search points: {}", e)))?;

        let records = response
            .result
            .into_iter()
            .map(|point| {
                let mut content = String::new();
                let mut metadata = HashMap::new();

                for (key, value) in point.payload {
                    let Some(text) = qdrant_value_to_string(&value) else {
                        continue;
                    };
                    if key == "document" {
                        content = text;
                    } else {
                        metadata.insert(key, text);
                    }
                }

                VectorRecord { content, metadata }
            })
            .collect();

        Ok(records)
    }

    async fn backend_count(&self) -> usize {
        let Some(qdrant) = self.qdrant.as_ref() else {
            return 0;
        };
        qdrant
            .collection_info(&self.collection)
            .await
            .ok()
            .and_then(|info| info.result.and_then(|r| r.points_count))
            .unwrap_or(0) as usize
    }

    fn require_embedder(&self) -> Result<&Arc<dyn EmbeddingClient>> {
        self.embedder.as_ref().ok_or_else(|| {
            AgentError::EmbeddingError("No embedding backend configured".to_string())
        })
    }

    fn require_qdrant(&self) -> Result<&QdrantClient> {
        self.qdrant.as_ref().ok_or_else(|| {
            AgentError::VectorStoreError("No vector backend configured".to_string())
        })
    }
}

fn qdrant_value_to_string(value: &QdrantValue) -> Option<String> {
    use qdrant_client::qdrant::value::Kind;
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::StringValue(s) => Some(s.clone()),
        _ => None,
    })
}
