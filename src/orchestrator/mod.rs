//! Task decomposition and fan-out/fan-in coordination
//!
//! The orchestrator owns no persistent state: for one user task it
//! decomposes into per-role subtasks (delegating to the reasoning engine,
//! with fixed defaults when that fails), opens one independent correlation
//! exchange per role, and collects every branch's outcome. Branches have
//! isolated timeout clocks; a slow or failed role never affects the others
//! and the orchestration as a whole never fails.

use crate::bus::reply::orchestrator_reply_channel;
use crate::bus::{MessageBus, ReplyWaiter};
use crate::errors::{AgentError, Result};
use crate::roles::RoleId;
use crate::reasoning::ReasoningEngine;
use crate::types::{ReplyPayload, TaskPayload};
use futures_util::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default per-branch wait for a role reply
pub const DEFAULT_ORCHESTRATE_TIMEOUT: Duration = Duration::from_secs(90);

/// Aggregated result of one orchestrated task: exactly one entry per role
pub type OrchestrationResult = HashMap<RoleId, ReplyPayload>;

/// Fan-out/fan-in coordinator over the shared bus
pub struct Orchestrator {
    bus: MessageBus,
    engine: Arc<dyn ReasoningEngine>,
}

impl Orchestrator {
    pub fn new(bus: MessageBus, engine: Arc<dyn ReasoningEngine>) -> Self {
        Self { bus, engine }
    }

    /// Decompose `user_task` and run every role's branch to completion
    ///
    /// Returns once all branches settle; each entry is either the role's
    /// reply payload or an error payload (`"<role> response timeout"`).
    pub async fn orchestrate(
        &self,
        user_task: &str,
        session_id: &str,
        timeout: Duration,
    ) -> OrchestrationResult {
        let subtasks = self.decompose(user_task).await;

        let branches = RoleId::ALL.map(|role| {
            let subtask = subtasks
                .get(&role)
                .cloned()
                .unwrap_or_else(|| default_subtask(role, user_task));
            async move {
                let outcome = self.call_role(role, &subtask, session_id, timeout).await;
                (role, outcome)
            }
        });

        let results: OrchestrationResult = join_all(branches).await.into_iter().collect();
        info!(
            session_id,
            errors = results.values().filter(|r| r.is_error()).count(),
            "Orchestration settled"
        );
        results
    }

    /// One independent request/reply exchange with a role
    async fn call_role(
        &self,
        role: RoleId,
        subtask: &str,
        session_id: &str,
        timeout: Duration,
    ) -> ReplyPayload {
        let channel = orchestrator_reply_channel(role.as_str());
        let waiter = ReplyWaiter::subscribe(&self.bus, &channel);

        let task = TaskPayload {
            user_task: subtask.to_string(),
            session_id: session_id.to_string(),
            reply_channel: channel,
            from_agent: None,
        };
        let payload = match serde_json::to_value(&task) {
            Ok(payload) => payload,
            Err(e) => {
                return ReplyPayload::Error {
                    error: e.to_string(),
                    session_id: session_id.to_string(),
                }
            }
        };

        debug!(role = %role, "Dispatching subtask");
        self.bus.publish(&role.task_topic(), "ORCH_TASK", payload);

        match waiter.wait(timeout, role.as_str()).await {
            Ok(message) => parse_reply(&message.payload, session_id),
            Err(e) => {
                warn!(role = %role, "Branch failed: {}", e);
                ReplyPayload::Error {
                    error: e.to_string(),
                    session_id: session_id.to_string(),
                }
            }
        }
    }

    /// Ask the engine for per-role subtasks; fall back to fixed defaults
    async fn decompose(&self, user_task: &str) -> HashMap<RoleId, String> {
        let prompt = decomposition_prompt(user_task);

        match self
            .engine
            .invoke(&prompt)
            .await
            .and_then(|output| parse_decomposition(&output))
        {
            Ok(subtasks) => subtasks,
            Err(e) => {
                warn!(error = %e, "Decomposition failed, using default subtasks");
                default_subtasks(user_task)
            }
        }
    }
}

fn decomposition_prompt(user_task: &str) -> String {
    format!(
        "You are coordinating a startup leadership team of four specialists: \
         CEO (vision and go-to-market), CTO (technology), CMO (marketing), CFO (finance).\n\
         Decompose the following task into one focused subtask per specialist.\n\
         Respond with only a JSON object with exactly the keys \"ceo\", \"cto\", \"cmo\", \"cfo\" \
         and string values.\n\nTask: {}",
        user_task
    )
}

/// Parse the engine's decomposition output, tolerating code fences and
/// surrounding prose; all four roles must be present and non-empty
fn parse_decomposition(output: &str) -> Result<HashMap<RoleId, String>> {
    let start = output
        .find('{')
        .ok_or_else(|| AgentError::DecompositionError("no JSON object in output".to_string()))?;
    let end = output
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| AgentError::DecompositionError("no JSON object in output".to_string()))?;

    let parsed: Value = serde_json::from_str(&output[start..=end])
        .map_err(|e| AgentError::DecompositionError(format!("invalid JSON: {}", e)))?;
    let object = parsed
        .as_object()
        .ok_or_else(|| AgentError::DecompositionError("not a JSON object".to_string()))?;

    let mut subtasks = HashMap::new();
    for role in RoleId::ALL {
        let subtask = object
            .get(role.as_str())
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AgentError::DecompositionError(format!("missing or empty subtask for {}", role))
            })?;
        subtasks.insert(role, subtask.to_string());
    }

    Ok(subtasks)
}

fn default_subtasks(user_task: &str) -> HashMap<RoleId, String> {
    RoleId::ALL
        .into_iter()
        .map(|role| (role, default_subtask(role, user_task)))
        .collect()
}

/// Fixed per-role subtask used when decomposition fails
fn default_subtask(role: RoleId, user_task: &str) -> String {
    match role {
        RoleId::Ceo => format!(
            "Refine the vision, value proposition, and go-to-market strategy for: {}",
            user_task
        ),
        RoleId::Cto => format!(
            "Assess the technical architecture and implementation plan for: {}",
            user_task
        ),
        RoleId::Cmo => format!(
            "Draft the marketing strategy and brand positioning for: {}",
            user_task
        ),
        RoleId::Cfo => format!(
            "Analyze the financial model, pricing, and budget for: {}",
            user_task
        ),
    }
}

/// Interpret a raw reply payload; anything unrecognizable becomes an error
/// entry rather than a panic or a dropped branch
fn parse_reply(payload: &Value, session_id: &str) -> ReplyPayload {
    serde_json::from_value(payload.clone()).unwrap_or_else(|_| ReplyPayload::Error {
        error: "malformed reply payload".to_string(),
        session_id: session_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{AgentError, Result};
    use async_trait::async_trait;
    use serde_json::json;

    struct ScriptedEngine {
        output: Result<String>,
    }

    impl ScriptedEngine {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                output: Ok(text.to_string()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                output: Err(AgentError::Generic("down".to_string())),
            })
        }
    }

    #[async_trait]
    impl ReasoningEngine for ScriptedEngine {
        async fn invoke(&self, _input: &str) -> Result<String> {
            match &self.output {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(AgentError::Generic("down".to_string())),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    #[test]
    fn test_parse_decomposition_plain_json() {
        let output = r#"{"ceo": "a", "cto": "b", "cmo": "c", "cfo": "d"}"#;
        let subtasks = parse_decomposition(output).unwrap();
        assert_eq!(subtasks[&RoleId::Cfo], "d");
        assert_eq!(subtasks.len(), 4);
    }

    #[test]
    fn test_parse_decomposition_with_fences() {
        let output = "Here you go:\n```json\n{\"ceo\": \"a\", \"cto\": \"b\", \"cmo\": \"c\", \"cfo\": \"d\"}\n```\n";
        assert!(parse_decomposition(output).is_ok());
    }

    #[test]
    fn test_parse_decomposition_missing_role() {
        let output = r#"{"ceo": "a", "cto": "b", "cmo": "c"}"#;
        let err = parse_decomposition(output).unwrap_err();
        assert!(matches!(err, AgentError::DecompositionError(_)));
        assert!(err.to_string().contains("cfo"));
    }

    #[test]
    fn test_parse_decomposition_garbage() {
        assert!(matches!(
            parse_decomposition("not json at all").unwrap_err(),
            AgentError::DecompositionError(_)
        ));
        assert!(matches!(
            parse_decomposition("{\"ceo\": \"\"}").unwrap_err(),
            AgentError::DecompositionError(_)
        ));
    }

    #[test]
    fn test_default_subtasks_embed_task() {
        let subtasks = default_subtasks("build a ride-sharing app");
        assert_eq!(subtasks.len(), 4);
        for subtask in subtasks.values() {
            assert!(subtask.contains("build a ride-sharing app"));
        }
    }

    #[test]
    fn test_parse_reply_malformed_becomes_error() {
        let reply = parse_reply(&json!({"weird": true}), "s1");
        assert!(reply.is_error());
    }

    #[tokio::test]
    async fn test_all_branches_time_out_without_workers() {
        let bus = MessageBus::new();
        let orchestrator = Orchestrator::new(bus, ScriptedEngine::failing());

        let results = orchestrator
            .orchestrate("anything", "s1", Duration::from_millis(50))
            .await;

        assert_eq!(results.len(), 4);
        for role in RoleId::ALL {
            match &results[&role] {
                ReplyPayload::Error { error, .. } => {
                    assert_eq!(error, &format!("{} response timeout", role));
                }
                other => panic!("expected timeout error, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_decomposition_used_when_parseable() {
        let engine = ScriptedEngine::ok(
            r#"{"ceo": "ceo sub", "cto": "cto sub", "cmo": "cmo sub", "cfo": "cfo sub"}"#,
        );
        let bus = MessageBus::new();

        // Capture what lands on one role topic
        let (_token, mut rx) = bus.subscribe("agent.cto.task");
        let orchestrator = Orchestrator::new(bus.clone(), engine);

        let _ = orchestrator
            .orchestrate("anything", "s1", Duration::from_millis(50))
            .await;

        let message = rx.recv().await.unwrap();
        assert_eq!(message.payload["userTask"], "cto sub");
        assert_eq!(message.payload["sessionId"], "s1");
        assert!(message.payload["replyChannel"]
            .as_str()
            .unwrap()
            .starts_with("orchestrator.cto.reply."));
    }
}
