//! Embedding backend for the vector memory tier
//!
//! The backend is optional and degrade-safe: callers treat any failure as a
//! signal to enter fallback mode rather than an error to propagate.

use crate::errors::{AgentError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Text-to-vector backend
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single text into a dense vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Cheap connectivity probe
    async fn is_available(&self) -> bool;
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// HTTP client for the Ollama embeddings endpoint
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    /// Create a new embedder
    ///
    /// # Arguments
    /// * `base_url` - Ollama base URL (e.g. http://127.0.0.1:11434)
    /// * `model` - embedding model name (e.g. "nomic-embed-text")
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(AgentError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "model": self.model, "prompt": text }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AgentError::EmbeddingError(format!(
                "Embedding API error: {}",
                response.status()
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AgentError::EmbeddingError(format!("Failed to parse response: {}", e)))?;

        if parsed.embedding.is_empty() {
            return Err(AgentError::EmbeddingError(
                "Backend returned an empty embedding".to_string(),
            ));
        }

        Ok(parsed.embedding)
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        self.client
            .get(&url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .is_ok()
    }
}
