//! Role-agent worker pipeline
//!
//! One worker per role, holding that role's bus handle, memory manager, and
//! tiered executor (explicit context, no process-wide singletons). The
//! worker consumes its task and request topics and, per incoming task:
//!
//! 1. Validates the payload (malformed → logged drop, caller times out)
//! 2. Runs peer collaborations extracted from the task text
//! 3. Assembles memory context
//! 4. Invokes the reasoning call under the tiered strategy
//! 5. Persists the interaction
//! 6. Publishes the reply on the task's correlation channel

pub mod mode;

pub use mode::{AgentMode, BaseMode};

use crate::bus::reply::collab_reply_channel;
use crate::bus::{BusMessage, MessageBus, ReplyWaiter};
use crate::collab::extract_collab_requests;
use crate::errors::Result;
use crate::memory::{ContextOptions, MemoryManager};
use crate::reasoning::TieredExecutor;
use crate::roles::RoleId;
use crate::types::{ReplyPayload, TaskPayload};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default wait for a peer collaboration reply
pub const DEFAULT_COLLAB_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables for one worker
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    pub collab_timeout: Duration,
    pub context: ContextOptions,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            collab_timeout: DEFAULT_COLLAB_TIMEOUT,
            context: ContextOptions::default(),
        }
    }
}

/// One role's task-processing worker
pub struct RoleWorker {
    role: RoleId,
    bus: MessageBus,
    memory: Arc<MemoryManager>,
    executor: Arc<TieredExecutor>,
    config: WorkerConfig,
}

impl RoleWorker {
    pub fn new(
        role: RoleId,
        bus: MessageBus,
        memory: Arc<MemoryManager>,
        executor: Arc<TieredExecutor>,
    ) -> Self {
        Self::with_config(role, bus, memory, executor, WorkerConfig::default())
    }

    pub fn with_config(
        role: RoleId,
        bus: MessageBus,
        memory: Arc<MemoryManager>,
        executor: Arc<TieredExecutor>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            role,
            bus,
            memory,
            executor,
            config,
        }
    }

    pub fn role(&self) -> RoleId {
        self.role
    }

    /// Subscribe to this role's task and request topics and process
    /// messages until the bus goes away
    ///
    /// Each message is handled on its own task; fan-out is unbounded and
    /// bounded only by callers' timeouts.
    pub fn spawn(self: Arc<Self>) {
        for topic in [self.role.task_topic(), self.role.request_topic()] {
            let worker = Arc::clone(&self);
            let (token, mut receiver) = worker.bus.subscribe(&topic);

            tokio::spawn(async move {
                // Keeps the subscription registered for the worker lifetime
                let _token = token;
                while let Some(message) = receiver.recv().await {
                    let worker = Arc::clone(&worker);
                    tokio::spawn(async move {
                        worker.handle_message(message).await;
                    });
                }
            });
        }
        info!(role = %self.role, "Worker listening");
    }

    /// Validate and process one incoming bus message
    pub async fn handle_message(&self, message: BusMessage) {
        let task = match TaskPayload::from_value(&message.topic, &message.payload) {
            Ok(task) => task,
            Err(e) => {
                // Deliberate silent drop: no reply is sent, the caller
                // observes its own timeout (uniform failure surface)
                warn!(role = %self.role, topic = %message.topic, error = %e,
                      "Dropping malformed message");
                return;
            }
        };

        debug!(role = %self.role, session_id = %task.session_id,
               from = task.from_agent.as_deref().unwrap_or("orchestrator"),
               "Task received");

        let reply_channel = task.reply_channel.clone();
        let session_id = task.session_id.clone();

        if let Err(e) = self.process_task(task).await {
            error!(role = %self.role, error = %e, "Pipeline failed");
            let error_reply = ReplyPayload::Error {
                error: e.to_string(),
                session_id,
            };
            if let Ok(payload) = serde_json::to_value(&error_reply) {
                self.publish_reply(&reply_channel, "AGENT_ERROR", payload);
            }
        }
    }

    async fn process_task(&self, task: TaskPayload) -> Result<()> {
        let mut mode = AgentMode::new();
        let mut working_input = task.user_task.clone();

        // Peer collaboration
        for request in extract_collab_requests(&task.user_task, self.role) {
            let response = self
                .consult_peer(request.agent, &request.question, &task.session_id)
                .await;
            working_input.push_str(&format!(
                "\n\n{}'s response: {}\n",
                request.agent.display_name(),
                response
            ));
            mode.note_collaboration();
        }

        // Context assembly
        let context = self
            .memory
            .get_relevant_context(&working_input, &task.session_id, self.config.context)
            .await;
        let context_used = context.len();
        if !context.is_empty() {
            let formatted = MemoryManager::format_context_for_prompt(&context);
            if !formatted.is_empty() {
                working_input = format!("{}Current Task: {}", formatted, working_input);
            }
            mode.note_context();
        }

        // Reasoning call under the tiered strategy; total, never errors
        let outcome = self.executor.invoke(&working_input, &task.user_task).await;
        mode.note_degradation(outcome.degradation);

        // Persist when a textual result exists
        if !outcome.output.is_empty() {
            self.memory
                .store_interaction(&task.user_task, &outcome.output, &task.session_id)
                .await;
        }

        let reply = ReplyPayload::Success {
            output: outcome.output,
            mode: mode.label(),
            context_used,
            session_id: task.session_id.clone(),
        };
        let kind = format!("{}_RESULT", self.role.display_name());
        self.publish_reply(&task.reply_channel, &kind, serde_json::to_value(&reply)?);

        Ok(())
    }

    /// Nested request/reply exchange with a peer role
    ///
    /// Timeouts are non-fatal: the placeholder text flows into the working
    /// input like a real answer would.
    async fn consult_peer(&self, peer: RoleId, question: &str, session_id: &str) -> String {
        let channel = collab_reply_channel(self.role.as_str(), peer.as_str());
        let waiter = ReplyWaiter::subscribe(&self.bus, &channel);

        let request = TaskPayload {
            user_task: format!("{} requests: {}", self.role.display_name(), question),
            session_id: session_id.to_string(),
            reply_channel: channel,
            from_agent: Some(self.role.as_str().to_string()),
        };

        let payload = match serde_json::to_value(&request) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(role = %self.role, peer = %peer, error = %e,
                      "Failed to encode collaboration request");
                return format!("No reply from {} (timeout).", peer.display_name());
            }
        };

        debug!(role = %self.role, peer = %peer, "Sending collaboration request");
        self.bus.publish(&peer.request_topic(), "AGENT_REQUEST", payload);

        match waiter.wait(self.config.collab_timeout, peer.as_str()).await {
            Ok(message) => {
                debug!(role = %self.role, peer = %peer, "Collaboration reply received");
                extract_output(&message.payload)
            }
            Err(_) => {
                warn!(role = %self.role, peer = %peer, "Peer did not reply in time");
                format!("No reply from {} (timeout).", peer.display_name())
            }
        }
    }

    fn publish_reply(&self, channel: &str, kind: &str, payload: Value) {
        let delivered = self.bus.publish(channel, kind, payload);
        if delivered == 0 {
            // Caller already gone (timed out or dropped); not retried
            warn!(role = %self.role, channel, "Reply had no subscriber");
        }
    }
}

/// Best-effort extraction of the substantive text from a reply payload
fn extract_output(payload: &Value) -> String {
    payload
        .get("output")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| payload.to_string())
}
