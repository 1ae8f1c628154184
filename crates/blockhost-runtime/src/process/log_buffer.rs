//! Bounded ring buffer of captured log entries.

use blockhost_core::{LogEntry, LogFilter};
use std::collections::VecDeque;

/// Fixed-capacity FIFO of log entries.
///
/// Appending beyond capacity evicts the single oldest entry.
#[derive(Debug)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogBuffer {
    /// Create an empty buffer. A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add an entry, removing the oldest if at capacity.
    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copy of all entries in arrival order.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Filtered copy; see [`LogFilter::apply`].
    pub fn query(&self, filter: &LogFilter) -> Vec<LogEntry> {
        filter.apply(self.entries.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockhost_core::LogSource;

    fn entry(message: &str) -> LogEntry {
        LogEntry::new(LogSource::Stdout, message)
    }

    fn messages(buffer: &LogBuffer) -> Vec<String> {
        buffer.snapshot().into_iter().map(|e| e.message).collect()
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let mut buffer = LogBuffer::new(3);
        for m in ["A", "B", "C", "D"] {
            buffer.push(entry(m));
        }
        assert_eq!(messages(&buffer), vec!["B", "C", "D"]);
    }

    #[test]
    fn holds_last_n_after_many_appends() {
        let capacity = 5;
        let mut buffer = LogBuffer::new(capacity);
        for i in 0..(capacity + 17) {
            buffer.push(entry(&i.to_string()));
            assert!(buffer.len() <= capacity);
        }
        let expected: Vec<String> = (17..22).map(|i| i.to_string()).collect();
        assert_eq!(messages(&buffer), expected);
    }

    #[test]
    fn snapshot_is_detached_from_buffer() {
        let mut buffer = LogBuffer::new(2);
        buffer.push(entry("one"));
        let snap = buffer.snapshot();
        buffer.push(entry("two"));
        buffer.push(entry("three"));
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].message, "one");
    }

    #[test]
    fn zero_capacity_keeps_one_entry() {
        let mut buffer = LogBuffer::new(0);
        buffer.push(entry("a"));
        buffer.push(entry("b"));
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(messages(&buffer), vec!["b"]);
    }

    #[test]
    fn query_by_source_with_limit() {
        let mut buffer = LogBuffer::new(10);
        buffer.push(LogEntry::new(LogSource::Stdout, "out"));
        buffer.push(LogEntry::new(LogSource::Stderr, "err"));

        let out = buffer.query(
            &LogFilter::default()
                .with_source(LogSource::Stderr)
                .with_limit(1),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, LogSource::Stderr);
        assert_eq!(out[0].message, "err");
    }
}
