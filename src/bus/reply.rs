//! One-shot correlation channel waits
//!
//! Every RPC-style exchange over the bus follows the same protocol: generate
//! a fresh reply channel, subscribe to it, publish the request embedding the
//! channel name, then race the first reply against a deadline. [`ReplyWaiter`]
//! packages that race so cleanup (unsubscribe) happens on both paths and a
//! late reply is discarded rather than acted on.

use crate::bus::{BusMessage, MessageBus, SubscriptionToken};
use crate::errors::{AgentError, Result};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;
use uuid::Uuid;

/// Pending wait on a single-use reply channel
///
/// Subscribe *before* publishing the request, or the reply can race the
/// subscription and be dropped by the bus.
pub struct ReplyWaiter {
    bus: MessageBus,
    channel: String,
    token: Option<SubscriptionToken>,
    receiver: UnboundedReceiver<BusMessage>,
}

impl ReplyWaiter {
    /// Subscribe to `channel` and return the pending waiter
    pub fn subscribe(bus: &MessageBus, channel: impl Into<String>) -> Self {
        let channel = channel.into();
        let (token, receiver) = bus.subscribe(&channel);
        Self {
            bus: bus.clone(),
            channel,
            token: Some(token),
            receiver,
        }
    }

    /// The reply channel name to embed in the outgoing request
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Wait for the first message on the channel, up to `timeout`
    ///
    /// Consumes the waiter: whichever outcome fires, the subscription is
    /// released before returning, so nothing dangles and any later message
    /// on the channel has no observable effect. `waited_for` names the peer
    /// for the timeout error (`"<peer> response timeout"`).
    pub async fn wait(mut self, timeout: Duration, waited_for: &str) -> Result<BusMessage> {
        let outcome = tokio::select! {
            received = self.receiver.recv() => match received {
                Some(message) => Ok(message),
                // Bus handle dropped out from under us; indistinguishable
                // from a peer that never replies.
                None => Err(AgentError::ReplyTimeout {
                    waited_for: waited_for.to_string(),
                }),
            },
            _ = tokio::time::sleep(timeout) => {
                debug!(channel = %self.channel, waited_for, timeout_ms = timeout.as_millis() as u64,
                       "Reply deadline elapsed");
                Err(AgentError::ReplyTimeout {
                    waited_for: waited_for.to_string(),
                })
            }
        };

        self.release();
        outcome
    }

    fn release(&mut self) {
        if let Some(token) = self.token.take() {
            self.bus.unsubscribe(token);
        }
    }
}

impl Drop for ReplyWaiter {
    fn drop(&mut self) {
        self.release();
    }
}

/// Fresh, globally-unique reply channel name for an orchestrator exchange
pub fn orchestrator_reply_channel(role: &str) -> String {
    format!("orchestrator.{}.reply.{}", role, Uuid::new_v4())
}

/// Fresh, globally-unique reply channel name for a peer collaboration
pub fn collab_reply_channel(from: &str, to: &str) -> String {
    format!("{}.{}.collab.reply.{}", from, to, Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_wait_resolves_with_first_message() {
        let bus = MessageBus::new();
        let waiter = ReplyWaiter::subscribe(&bus, "reply.a");

        bus.publish("reply.a", "REPLY", json!({"output": "first"}));
        bus.publish("reply.a", "REPLY", json!({"output": "second"}));

        let message = waiter.wait(Duration::from_secs(1), "ceo").await.unwrap();
        assert_eq!(message.payload["output"], "first");

        // Channel is single-use: the subscription is gone, the second
        // message was never consumed and later publishes are dropped.
        assert_eq!(bus.subscriber_count("reply.a"), 0);
        assert_eq!(bus.publish("reply.a", "REPLY", json!({"output": "third"})), 0);
    }

    #[tokio::test]
    async fn test_wait_times_out_and_unsubscribes() {
        let bus = MessageBus::new();
        let waiter = ReplyWaiter::subscribe(&bus, "reply.b");

        let err = waiter
            .wait(Duration::from_millis(20), "cto")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "cto response timeout");
        assert_eq!(bus.subscriber_count("reply.b"), 0);
    }

    #[tokio::test]
    async fn test_drop_releases_subscription() {
        let bus = MessageBus::new();
        let waiter = ReplyWaiter::subscribe(&bus, "reply.c");
        assert_eq!(bus.subscriber_count("reply.c"), 1);
        drop(waiter);
        assert_eq!(bus.subscriber_count("reply.c"), 0);
    }

    #[tokio::test]
    async fn test_message_buffered_before_wait_is_seen() {
        let bus = MessageBus::new();
        let waiter = ReplyWaiter::subscribe(&bus, "reply.d");

        // Reply arrives before the caller starts waiting
        bus.publish("reply.d", "REPLY", json!({"output": "early"}));

        let message = waiter.wait(Duration::from_millis(50), "cmo").await.unwrap();
        assert_eq!(message.payload["output"], "early");
    }

    #[test]
    fn test_channel_names_are_unique() {
        let a = orchestrator_reply_channel("ceo");
        let b = orchestrator_reply_channel("ceo");
        assert_ne!(a, b);
        assert!(a.starts_with("orchestrator.ceo.reply."));

        let c = collab_reply_channel("ceo", "cfo");
        assert!(c.starts_with("ceo.cfo.collab.reply."));
    }
}
