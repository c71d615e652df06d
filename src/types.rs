//! Typed envelopes for bus payloads
//!
//! Every topic family carries a known payload shape. Validation happens at
//! the bus boundary: a payload that does not deserialize into its envelope
//! is a typed rejection, not an ad hoc field-existence check.

use crate::errors::{AgentError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Task or collaboration request addressed to a role
///
/// Carried on `agent.<role>.task` (orchestrator-originated, `from_agent`
/// absent) and `agent.<role>.request` (peer-originated, `from_agent` set).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub user_task: String,
    pub session_id: String,
    /// Single-use correlation channel the reply must be published on
    pub reply_channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_agent: Option<String>,
}

impl TaskPayload {
    /// Validate a raw bus payload into a typed task
    ///
    /// Rejects payloads missing `userTask` or `replyChannel`. `sessionId`
    /// defaults to `"default"` when absent, matching the wire protocol.
    pub fn from_value(topic: &str, payload: &Value) -> Result<Self> {
        let user_task = payload
            .get("userTask")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AgentError::MalformedMessage {
                topic: topic.to_string(),
                reason: "missing userTask".to_string(),
            })?;

        let reply_channel = payload
            .get("replyChannel")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AgentError::MalformedMessage {
                topic: topic.to_string(),
                reason: "missing replyChannel".to_string(),
            })?;

        let session_id = payload
            .get("sessionId")
            .and_then(Value::as_str)
            .unwrap_or("default");

        let from_agent = payload
            .get("fromAgent")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            user_task: user_task.to_string(),
            session_id: session_id.to_string(),
            reply_channel: reply_channel.to_string(),
            from_agent,
        })
    }
}

/// Reply published on a correlation channel
///
/// Success and error replies share a channel; on the wire a success has an
/// `output` field and an error has an `error` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ReplyPayload {
    #[serde(rename_all = "camelCase")]
    Success {
        output: String,
        mode: String,
        context_used: usize,
        session_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Error { error: String, session_id: String },
}

impl ReplyPayload {
    /// The substantive answer text, if this is a success reply
    pub fn output(&self) -> Option<&str> {
        match self {
            ReplyPayload::Success { output, .. } => Some(output),
            ReplyPayload::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ReplyPayload::Error { .. })
    }
}
