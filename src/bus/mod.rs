//! In-process topic-based publish/subscribe bus
//!
//! The coordination substrate for all cross-role traffic:
//! - Named topics, zero or more subscribers each
//! - Delivery is queued per subscriber via unbounded channels
//! - No durability: a message published with no active subscriber is
//!   silently dropped (models "nobody listening yet")
//! - No acks, no retries at this layer; reliability is built by callers
//!   out of correlation channels and timeouts (see [`reply`])

pub mod reply;

pub use reply::ReplyWaiter;

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

/// A message delivered to topic subscribers
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub topic: String,
    /// Message kind tag (`CEO_RESULT`, `ORCH_TASK`, ...), informational
    pub kind: String,
    pub payload: Value,
}

struct Subscriber {
    id: u64,
    sender: UnboundedSender<BusMessage>,
}

#[derive(Default)]
struct BusState {
    topics: HashMap<String, Vec<Subscriber>>,
    next_id: u64,
}

/// Handle to the shared in-process bus
///
/// Cheap to clone; every role holds one handle for its process lifetime.
#[derive(Clone, Default)]
pub struct MessageBus {
    state: Arc<Mutex<BusState>>,
}

/// Token identifying one subscription, used to unsubscribe
#[derive(Debug)]
pub struct SubscriptionToken {
    topic: String,
    id: u64,
}

impl SubscriptionToken {
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a payload to all current subscribers of `topic`
    ///
    /// Returns the number of subscribers the message was queued for. Zero
    /// means the message was dropped; that is not an error here.
    pub fn publish(&self, topic: &str, kind: &str, payload: Value) -> usize {
        let mut state = lock_state(&self.state);

        let message = BusMessage {
            topic: topic.to_string(),
            kind: kind.to_string(),
            payload,
        };

        let delivered = match state.topics.get_mut(topic) {
            Some(subscribers) => {
                // Prune subscribers whose receiver has been dropped
                subscribers.retain(|sub| sub.sender.send(message.clone()).is_ok());
                if subscribers.is_empty() {
                    state.topics.remove(topic);
                    0
                } else {
                    subscribers.len()
                }
            }
            None => 0,
        };

        if delivered == 0 {
            debug!(topic, kind, "No subscribers, message dropped");
        } else {
            trace!(topic, kind, delivered, "Message published");
        }

        delivered
    }

    /// Subscribe to a topic
    ///
    /// Returns a token for [`unsubscribe`](Self::unsubscribe) and the
    /// receiving end of the subscription queue.
    pub fn subscribe(&self, topic: &str) -> (SubscriptionToken, UnboundedReceiver<BusMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut state = lock_state(&self.state);

        let id = state.next_id;
        state.next_id += 1;
        state
            .topics
            .entry(topic.to_string())
            .or_default()
            .push(Subscriber { id, sender });

        trace!(topic, id, "Subscribed");
        (
            SubscriptionToken {
                topic: topic.to_string(),
                id,
            },
            receiver,
        )
    }

    /// Remove a subscription; idempotent (no-op if already removed)
    pub fn unsubscribe(&self, token: SubscriptionToken) {
        let mut state = lock_state(&self.state);

        if let Some(subscribers) = state.topics.get_mut(&token.topic) {
            subscribers.retain(|sub| sub.id != token.id);
            if subscribers.is_empty() {
                state.topics.remove(&token.topic);
            }
        }
        trace!(topic = %token.topic, id = token.id, "Unsubscribed");
    }

    /// Number of active subscriptions for a topic
    pub fn subscriber_count(&self, topic: &str) -> usize {
        let state = lock_state(&self.state);
        state.topics.get(topic).map_or(0, Vec::len)
    }
}

/// Recover the guard even if a subscriber panicked while holding it;
/// the registry itself stays structurally valid.
fn lock_state(state: &Mutex<BusState>) -> std::sync::MutexGuard<'_, BusState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let bus = MessageBus::new();
        let (_t1, mut rx1) = bus.subscribe("agent.ceo.task");
        let (_t2, mut rx2) = bus.subscribe("agent.ceo.task");

        let delivered = bus.publish("agent.ceo.task", "ORCH_TASK", json!({"userTask": "x"}));
        assert_eq!(delivered, 2);

        assert_eq!(rx1.recv().await.unwrap().payload["userTask"], "x");
        assert_eq!(rx2.recv().await.unwrap().kind, "ORCH_TASK");
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = MessageBus::new();
        assert_eq!(bus.publish("agent.ghost.task", "TASK", json!({})), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let bus = MessageBus::new();
        let (token, rx) = bus.subscribe("reply.1");
        assert_eq!(bus.subscriber_count("reply.1"), 1);

        bus.unsubscribe(token);
        assert_eq!(bus.subscriber_count("reply.1"), 0);

        // Second removal of the same topic is a no-op
        let (token2, _rx2) = bus.subscribe("reply.1");
        bus.unsubscribe(token2);
        bus.unsubscribe(SubscriptionToken {
            topic: "reply.1".to_string(),
            id: 999,
        });
        drop(rx);
    }

    #[tokio::test]
    async fn test_dropped_receiver_pruned_on_publish() {
        let bus = MessageBus::new();
        let (_token, rx) = bus.subscribe("reply.2");
        drop(rx);

        assert_eq!(bus.publish("reply.2", "REPLY", json!({})), 0);
        assert_eq!(bus.subscriber_count("reply.2"), 0);
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let bus = MessageBus::new();
        let (_t1, mut rx_ceo) = bus.subscribe("agent.ceo.task");
        let (_t2, mut rx_cto) = bus.subscribe("agent.cto.task");

        bus.publish("agent.cto.task", "TASK", json!({"to": "cto"}));

        assert_eq!(rx_cto.recv().await.unwrap().payload["to"], "cto");
        assert!(rx_ceo.try_recv().is_err());
    }
}
