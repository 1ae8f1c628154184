//! In-process event broadcasting over a tokio broadcast channel.

use blockhost_core::{BroadcastPort, ServerEvent};
use tokio::sync::broadcast;
use tracing::trace;

/// Broadcast channel capacity for server events.
pub const CHANNEL_CAPACITY: usize = 1024;

/// An event together with the topic it was published on.
#[derive(Debug, Clone)]
pub struct TopicEvent {
    pub topic: String,
    pub event: ServerEvent,
}

/// Broadcast port backed by `tokio::sync::broadcast`.
///
/// Slow subscribers lag and lose the oldest events rather than blocking publishers.
pub struct TokioBroadcaster {
    sender: broadcast::Sender<TopicEvent>,
}

impl TokioBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to every topic.
    pub fn subscribe(&self) -> broadcast::Receiver<TopicEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for TokioBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastPort for TokioBroadcaster {
    fn publish(&self, topic: &str, event: ServerEvent) {
        // Nobody listening is not an error
        if self.sender.receiver_count() > 0 {
            trace!(topic, "Broadcasting server event");
            let _ = self.sender.send(TopicEvent {
                topic: topic.to_string(),
                event,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockhost_core::LifecycleState;

    #[tokio::test]
    async fn subscribers_receive_topic_and_event() {
        let broadcaster = TokioBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        let event = ServerEvent::status("alpha", LifecycleState::Running, Some(7));
        broadcaster.publish(&event.topic(), event.clone());

        let received = rx.recv().await.unwrap();
        assert_eq!(received.topic, "server:alpha:status");
        assert_eq!(received.event, event);
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let broadcaster = TokioBroadcaster::new();
        assert_eq!(broadcaster.subscriber_count(), 0);
        broadcaster.publish("server:alpha:logs", ServerEvent::status("alpha", LifecycleState::Stopped, None));
    }
}
