//! Reasoning engine abstraction and Ollama-backed implementation
//!
//! The engine is treated as an opaque, failure-prone call: text in, text
//! out. Degradation strategy lives in [`executor`], backoff in [`retry`].

pub mod executor;
pub mod retry;

pub use executor::{Degradation, ExecutionOutcome, TieredExecutor};
pub use retry::RetryPolicy;

use crate::errors::{AgentError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Opaque text-in/text-out reasoning capability
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// Produce a completion for `input`; may fail
    async fn invoke(&self, input: &str) -> Result<String>;

    /// Engine name for logging and error reporting
    fn name(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Reasoning engine backed by the Ollama generate endpoint
pub struct OllamaEngine {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaEngine {
    /// Create a new engine
    ///
    /// # Arguments
    /// * `base_url` - Ollama base URL (e.g. http://127.0.0.1:11434)
    /// * `model` - model name (e.g. "llama3.1:8b")
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(AgentError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
        })
    }

    /// Check if the backing server is reachable
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        self.client
            .get(&url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .is_ok()
    }
}

#[async_trait]
impl ReasoningEngine for OllamaEngine {
    async fn invoke(&self, input: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "model": self.model,
                "prompt": input,
                "stream": false,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AgentError::ReasoningError {
                engine: self.model.clone(),
                reason: format!("API error: {}", response.status()),
            });
        }

        let parsed: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| AgentError::ReasoningError {
                    engine: self.model.clone(),
                    reason: format!("Failed to parse response: {}", e),
                })?;

        Ok(parsed.response)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_creation() {
        let engine = OllamaEngine::new("http://127.0.0.1:11434", "llama3.1:8b").unwrap();
        assert_eq!(engine.name(), "llama3.1:8b");
    }

    #[tokio::test]
    #[ignore] // Requires Ollama running
    async fn test_invoke_integration() {
        let engine = OllamaEngine::new("http://127.0.0.1:11434", "llama3.1:8b").unwrap();
        let output = engine.invoke("Say hello in one word.").await.unwrap();
        assert!(!output.is_empty());
    }
}
