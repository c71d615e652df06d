//! Error types for the Boardroom agent substrate
//!
//! Provides comprehensive error handling with context propagation
//! across the bus, memory, and reasoning layers.

use thiserror::Error;

/// Main error type for the agent coordination system
#[derive(Error, Debug)]
pub enum AgentError {
    /// Malformed bus payload rejected at the boundary
    #[error("Malformed message on {topic}: {reason}")]
    MalformedMessage { topic: String, reason: String },

    /// Reply deadline elapsed with no message on the correlation channel
    #[error("{waited_for} response timeout")]
    ReplyTimeout { waited_for: String },

    /// Reasoning engine call failed
    #[error("Reasoning engine '{engine}' failed: {reason}")]
    ReasoningError { engine: String, reason: String },

    /// Embedding backend errors
    #[error("Embedding failed: {0}")]
    EmbeddingError(String),

    /// Vector store errors
    #[error("Vector store error: {0}")]
    VectorStoreError(String),

    /// Task decomposition produced unusable output
    #[error("Decomposition failed: {0}")]
    DecompositionError(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic errors with context
    #[error("Agent error: {0}")]
    Generic(String),
}

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Convert anyhow errors to AgentError
impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_timeout_display() {
        let err = AgentError::ReplyTimeout {
            waited_for: "cto".to_string(),
        };
        assert_eq!(err.to_string(), "cto response timeout");
    }

    #[test]
    fn test_malformed_message_display() {
        let err = AgentError::MalformedMessage {
            topic: "agent.ceo.task".to_string(),
            reason: "missing replyChannel".to_string(),
        };
        assert!(err.to_string().contains("agent.ceo.task"));
        assert!(err.to_string().contains("replyChannel"));
    }
}
