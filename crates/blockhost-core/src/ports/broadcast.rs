//! Broadcast port for log and status events.

use crate::events::ServerEvent;

/// Publishes server events to interested observers.
///
/// Fire-and-forget: implementations must not block and may drop events when
/// nobody is listening.
#[cfg_attr(feature = "mock", mockall::automock)]
pub trait BroadcastPort: Send + Sync {
    fn publish(&self, topic: &str, event: ServerEvent);
}

/// A broadcast port that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBroadcast;

impl BroadcastPort for NoopBroadcast {
    fn publish(&self, _topic: &str, _event: ServerEvent) {}
}
