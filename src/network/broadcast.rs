//! Realtime Broadcast Fan-Out
//!
//! Registry of connected subscribers, each identified by a stable
//! UUID and backed by a bounded channel into its connection's writer
//! task. Publishing serializes a message once and best-effort sends
//! the same frame to every subscriber; slow or dead subscribers are
//! skipped and pruned rather than failing the publish.

use std::collections::BTreeMap;
use std::sync::RwLock;

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::network::protocol::ServerMessage;

/// Per-subscriber outbound queue depth.
const SUBSCRIBER_QUEUE_DEPTH: usize = 64;

/// Fan-out registry for server push messages.
#[derive(Debug, Default)]
pub struct Broadcaster {
    subscribers: RwLock<BTreeMap<Uuid, mpsc::Sender<String>>>,
}

impl Broadcaster {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a subscription channel. Returns the receiving half for
    /// the connection's writer task.
    pub fn subscribe(&self, id: Uuid) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_DEPTH);
        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        // Re-subscribing replaces the old channel, which closes it
        subs.insert(id, tx);
        rx
    }

    /// Remove a subscriber. Removing an unknown id is a no-op.
    pub fn unsubscribe(&self, id: Uuid) {
        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subs.remove(&id);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        let subs = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
        subs.len()
    }

    /// Serialize once and push the frame to every subscriber.
    ///
    /// Best-effort: a full queue drops the frame for that subscriber
    /// only, and closed channels are pruned. Never returns an error;
    /// a message that cannot serialize is logged and dropped.
    pub fn publish(&self, message: &ServerMessage) {
        let frame = match message.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "dropping unserializable broadcast");
                return;
            }
        };
        self.publish_raw(&frame);
    }

    /// Push an already-serialized frame to every subscriber.
    pub fn publish_raw(&self, frame: &str) {
        let mut dead = Vec::new();
        {
            let subs = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
            for (id, tx) in subs.iter() {
                match tx.try_send(frame.to_string()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        debug!(subscriber = %id, "subscriber queue full, frame dropped");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        dead.push(*id);
                    }
                }
            }
        }

        if !dead.is_empty() {
            let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
            for id in dead {
                subs.remove(&id);
            }
        }
    }

    /// Send a frame to one subscriber, if still registered.
    pub fn send_to(&self, id: Uuid, message: &ServerMessage) {
        let frame = match message.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "dropping unserializable message");
                return;
            }
        };
        let subs = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = subs.get(&id) {
            let _ = tx.try_send(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn countdown(seconds: u32) -> ServerMessage {
        ServerMessage::Countdown { seconds }
    }

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let b = Broadcaster::new();
        let mut rx1 = b.subscribe(Uuid::new_v4());
        let mut rx2 = b.subscribe(Uuid::new_v4());

        b.publish(&countdown(3));

        let f1 = rx1.recv().await.unwrap();
        let f2 = rx2.recv().await.unwrap();
        assert_eq!(f1, f2);
        assert!(f1.contains("countdown"));
    }

    #[tokio::test]
    async fn test_resubscribe_replaces_channel() {
        let b = Broadcaster::new();
        let id = Uuid::new_v4();
        let mut old_rx = b.subscribe(id);
        let mut new_rx = b.subscribe(id);
        assert_eq!(b.subscriber_count(), 1);

        b.publish(&countdown(1));
        assert!(new_rx.recv().await.is_some());
        // Old channel was closed by the replacement
        assert!(old_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let b = Broadcaster::new();
        let id = Uuid::new_v4();
        let _rx = b.subscribe(id);

        b.unsubscribe(id);
        b.unsubscribe(id);
        assert_eq!(b.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_dead_subscriber_pruned_without_failing_publish() {
        let b = Broadcaster::new();
        let dead_rx = b.subscribe(Uuid::new_v4());
        let mut live_rx = b.subscribe(Uuid::new_v4());
        drop(dead_rx);

        b.publish(&countdown(2));

        assert!(live_rx.recv().await.is_some());
        assert_eq!(b.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_send_to_targets_one_subscriber() {
        let b = Broadcaster::new();
        let id = Uuid::new_v4();
        let mut rx = b.subscribe(id);
        let mut other = b.subscribe(Uuid::new_v4());

        b.send_to(id, &countdown(9));
        assert!(rx.recv().await.is_some());
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_queue_drops_frame_only_for_that_subscriber() {
        let b = Broadcaster::new();
        let slow_id = Uuid::new_v4();
        let _slow_rx = b.subscribe(slow_id);
        let mut fast_rx = b.subscribe(Uuid::new_v4());

        for i in 0..(SUBSCRIBER_QUEUE_DEPTH + 5) {
            b.publish(&countdown(i as u32));
        }

        // The fast subscriber's queue also filled, but nothing panicked
        // and the slow subscriber is still registered
        assert_eq!(b.subscriber_count(), 2);
        assert!(fast_rx.recv().await.is_some());
    }
}
