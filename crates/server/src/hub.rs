//! Topic fan-out to websocket sessions.
//!
//! Each session owns a bounded channel. Publishing never waits on a slow
//! client: a full channel drops the message for that session only.
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

pub type SessionId = u64;

/// Receiving half handed to a websocket session.
pub struct Subscription {
    pub id: SessionId,
    pub topic: String,
    pub receiver: mpsc::Receiver<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct HubStats {
    pub topics: usize,
    pub sessions: usize,
}

#[derive(Debug, Default)]
pub struct Hub {
    next_id: AtomicU64,
    topics: DashMap<String, DashMap<SessionId, mpsc::Sender<String>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session on `topic` with a buffer of `capacity` messages.
    pub fn subscribe(&self, topic: &str, capacity: usize) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        self.topics
            .entry(topic.to_string())
            .or_default()
            .insert(id, sender);
        debug!(session_id = id, topic, "session_subscribed");
        Subscription {
            id,
            topic: topic.to_string(),
            receiver,
        }
    }

    pub fn unsubscribe(&self, topic: &str, id: SessionId) {
        if let Some(sessions) = self.topics.get(topic) {
            sessions.remove(&id);
        }
        self.topics.remove_if(topic, |_, sessions| sessions.is_empty());
        debug!(session_id = id, topic, "session_unsubscribed");
    }

    /// Deliver `text` to every session on `topic`. Returns how many sessions
    /// accepted it.
    pub fn publish(&self, topic: &str, text: &str) -> usize {
        let Some(sessions) = self.topics.get(topic) else {
            return 0;
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for entry in sessions.iter() {
            match entry.value().try_send(text.to_string()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(session_id = *entry.key(), topic, "session_buffer_full_message_dropped");
                    metrics::counter!("relay_messages_dropped_total").increment(1);
                }
                Err(TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }
        for id in closed {
            sessions.remove(&id);
        }
        drop(sessions);
        self.topics.remove_if(topic, |_, sessions| sessions.is_empty());

        metrics::counter!("relay_messages_delivered_total").increment(delivered as u64);
        delivered
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map(|s| s.len()).unwrap_or(0)
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            topics: self.topics.len(),
            sessions: self.topics.iter().map(|entry| entry.value().len()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_only_matching_topic() {
        let hub = Hub::new();
        let mut a = hub.subscribe("job:j1:u1", 4);
        let mut b = hub.subscribe("job:j2:u1", 4);

        assert_eq!(hub.publish("job:j1:u1", "hello"), 1);
        assert_eq!(a.receiver.recv().await.as_deref(), Some("hello"));
        assert!(b.receiver.try_recv().is_err());
        assert_eq!(hub.publish("project:p9:u1", "nobody"), 0);
    }

    #[tokio::test]
    async fn full_session_drops_instead_of_blocking() {
        let hub = Hub::new();
        let mut slow = hub.subscribe("job:j1:u1", 1);
        let mut fast = hub.subscribe("job:j1:u1", 8);

        assert_eq!(hub.publish("job:j1:u1", "one"), 2);
        assert_eq!(hub.publish("job:j1:u1", "two"), 1);

        assert_eq!(slow.receiver.recv().await.as_deref(), Some("one"));
        assert!(slow.receiver.try_recv().is_err());
        assert_eq!(fast.receiver.recv().await.as_deref(), Some("one"));
        assert_eq!(fast.receiver.recv().await.as_deref(), Some("two"));
    }

    #[test]
    fn closed_sessions_and_empty_topics_are_pruned() {
        let hub = Hub::new();
        let sub = hub.subscribe("project:p1:u1", 4);
        drop(sub);
        assert_eq!(hub.publish("project:p1:u1", "x"), 0);
        assert_eq!(hub.stats().topics, 0);

        let sub = hub.subscribe("project:p1:u1", 4);
        assert_eq!(hub.subscriber_count("project:p1:u1"), 1);
        hub.unsubscribe(&sub.topic, sub.id);
        assert_eq!(hub.stats().sessions, 0);
    }
}
