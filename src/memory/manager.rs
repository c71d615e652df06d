//! Two-tier memory coordination for one role
//!
//! Owns the exact-match session tier and the approximate vector tier.
//! Retrieval orders context session-first then vector, never interleaved;
//! persistence writes the session tier unconditionally and the vector tier
//! best-effort.

use crate::memory::session::SessionStore;
use crate::memory::vector::{VectorMemory, VectorRecord};
use crate::roles::RoleId;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// Retrieval limits per tier
#[derive(Debug, Clone, Copy)]
pub struct ContextOptions {
    pub vector_top_k: usize,
    pub session_limit: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            vector_top_k: 3,
            session_limit: 3,
        }
    }
}

/// Which tier a context item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Session,
    Vector,
}

/// One piece of retrieved context
#[derive(Debug, Clone)]
pub struct ContextItem {
    pub kind: ContextKind,
    pub content: String,
    pub metadata: HashMap<String, String>,
}

/// Health summary for status reporting
#[derive(Debug, Clone)]
pub struct MemoryStatus {
    pub role: RoleId,
    pub session_count: usize,
    pub vector_mode: &'static str,
    pub vector_entries: usize,
}

/// Per-role memory manager; each role owns exactly one instance for its
/// process lifetime
pub struct MemoryManager {
    role: RoleId,
    sessions: Mutex<SessionStore>,
    vector: VectorMemory,
}

impl MemoryManager {
    pub fn new(role: RoleId, vector: VectorMemory) -> Self {
        Self {
            role,
            sessions: Mutex::new(SessionStore::new()),
            vector,
        }
    }

    /// Manager with no vector backend at all; the vector tier runs on the
    /// in-memory fallback list from the start
    pub fn in_memory(role: RoleId) -> Self {
        Self::new(
            role,
            VectorMemory::fallback_only(format!("{}-memory", role.as_str())),
        )
    }

    pub fn role(&self) -> RoleId {
        self.role
    }

    /// Persist a completed interaction
    ///
    /// The session tier always records it; the vector tier is best-effort
    /// and self-heals internally, so nothing here can fail the caller.
    pub async fn store_interaction(&self, user_task: &str, result: &str, session_id: &str) {
        if user_task.is_empty() || result.is_empty() {
            debug!(role = %self.role, "Skipping empty interaction");
            return;
        }

        {
            let mut sessions = self.sessions.lock().await;
            sessions.record(session_id, user_task, result);
        }

        let mut metadata = HashMap::new();
        metadata.insert("timestamp".to_string(), Utc::now().to_rfc3339());
        metadata.insert("taskType".to_string(), self.role.as_str().to_string());
        metadata.insert("sessionId".to_string(), session_id.to_string());

        self.vector
            .store(VectorRecord {
                content: format!("Task: {}\nResult: {}", user_task, result),
                metadata,
            })
            .await;

        debug!(role = %self.role, session_id, "Interaction stored");
    }

    /// Retrieve context for a query: vector matches, then the session's
    /// most recent interactions prepended (session-first ordering)
    pub async fn get_relevant_context(
        &self,
        query: &str,
        session_id: &str,
        options: ContextOptions,
    ) -> Vec<ContextItem> {
        if query.is_empty() {
            return Vec::new();
        }

        let mut context: Vec<ContextItem> = self
            .vector
            .search(query, options.vector_top_k)
            .await
            .into_iter()
            .map(|record| ContextItem {
                kind: ContextKind::Vector,
                content: record.content,
                metadata: record.metadata,
            })
            .collect();

        let session_items: Vec<ContextItem> = {
            let sessions = self.sessions.lock().await;
            sessions
                .last_n(session_id, options.session_limit)
                .into_iter()
                .map(|record| {
                    let mut metadata = HashMap::new();
                    metadata.insert("timestamp".to_string(), record.timestamp.to_rfc3339());
                    metadata.insert("sessionId".to_string(), session_id.to_string());
                    ContextItem {
                        kind: ContextKind::Session,
                        content: format!("Previous: {} -> {}", record.user_task, record.result),
                        metadata,
                    }
                })
                .collect()
        };

        context.splice(0..0, session_items);

        debug!(role = %self.role, session_id, items = context.len(), "Context retrieved");
        context
    }

    /// Render retrieved context as the canonical two-block prompt prefix
    pub fn format_context_for_prompt(items: &[ContextItem]) -> String {
        if items.is_empty() {
            return String::new();
        }

        let session_block: Vec<&str> = items
            .iter()
            .filter(|item| item.kind == ContextKind::Session)
            .map(|item| item.content.as_str())
            .collect();

        let vector_block: Vec<&str> = items
            .iter()
            .filter(|item| item.kind == ContextKind::Vector)
            .map(|item| item.content.as_str())
            .collect();

        let mut formatted = String::new();
        if !session_block.is_empty() {
            formatted.push_str(&format!(
                "Recent Session Context:\n{}\n\n",
                session_block.join("\n")
            ));
        }
        if !vector_block.is_empty() {
            formatted.push_str(&format!(
                "Relevant Historical Context:\n{}\n\n",
                vector_block.join("\n")
            ));
        }

        formatted
    }

    /// Drop one session's history; returns whether it existed
    pub async fn clear_session(&self, session_id: &str) -> bool {
        self.sessions.lock().await.clear_session(session_id)
    }

    pub async fn status(&self) -> MemoryStatus {
        let session_count = self.sessions.lock().await.session_count();
        let vector_stats = self.vector.stats().await;
        MemoryStatus {
            role: self.role,
            session_count,
            vector_mode: vector_stats.mode,
            vector_entries: vector_stats.entries,
        }
    }
}
