//! Per-server log capture: buffer the entry, then publish it.

use blockhost_core::{BroadcastPort, LogEntry, LogFilter, LogSource, ServerEvent, log_topic};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::log_buffer::LogBuffer;

/// Owns a server's log buffer and forwards every entry to the broadcast port.
///
/// Safe to call from any task; the buffer lock is never held while publishing.
pub struct LogSink {
    server_id: String,
    topic: String,
    buffer: Mutex<LogBuffer>,
    broadcast: Arc<dyn BroadcastPort>,
}

impl LogSink {
    pub fn new(server_id: impl Into<String>, capacity: usize, broadcast: Arc<dyn BroadcastPort>) -> Self {
        let server_id = server_id.into();
        Self {
            topic: log_topic(&server_id),
            server_id,
            buffer: Mutex::new(LogBuffer::new(capacity)),
            broadcast,
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Record a line from `source`.
    ///
    /// Entries are stamped under the buffer lock, so buffer order and
    /// timestamp order agree. Publishing happens after the lock is released;
    /// concurrent appends may reach subscribers in a different order.
    pub fn append(&self, source: LogSource, message: impl Into<String>) -> LogEntry {
        let message = message.into();
        let entry = {
            let mut buffer = self.lock();
            let entry = LogEntry::new(source, message);
            buffer.push(entry.clone());
            entry
        };
        self.broadcast
            .publish(&self.topic, ServerEvent::log(self.server_id.clone(), entry.clone()));
        entry
    }

    /// Shorthand for a supervisor-generated entry.
    pub fn system(&self, message: impl Into<String>) -> LogEntry {
        self.append(LogSource::System, message)
    }

    pub fn query(&self, filter: &LogFilter) -> Vec<LogEntry> {
        self.lock().query(filter)
    }

    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.lock().snapshot()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while pushing cannot leave the deque inconsistent, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, LogBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
