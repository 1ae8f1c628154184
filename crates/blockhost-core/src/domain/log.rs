//! Captured server output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default number of entries returned by a log query.
pub const DEFAULT_LOG_LIMIT: usize = 100;

/// Where a log entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    Stdout,
    Stderr,
    /// Emitted by the supervisor itself (exit notices, failures).
    System,
    /// A console command sent to the process.
    Command,
}

impl LogSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
            Self::System => "system",
            Self::Command => "command",
        }
    }
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdout" => Ok(Self::Stdout),
            "stderr" => Ok(Self::Stderr),
            "system" => Ok(Self::System),
            "command" => Ok(Self::Command),
            other => Err(format!("unknown log source: {other}")),
        }
    }
}

/// A single line of captured output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub source: LogSource,
}

impl LogEntry {
    /// Create an entry stamped with the current time.
    pub fn new(source: LogSource, message: impl Into<String>) -> Self {
        Self::at(Utc::now(), source, message)
    }

    /// Create an entry with an explicit timestamp.
    pub fn at(timestamp: DateTime<Utc>, source: LogSource, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
            source,
        }
    }
}

/// Query filter shared by the live buffer and the log file reader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogFilter {
    /// Only entries with this source.
    pub source: Option<LogSource>,
    /// Case-insensitive substring match on the message.
    pub search: Option<String>,
    /// Maximum number of entries, most recent kept ([`DEFAULT_LOG_LIMIT`] if unset).
    pub limit: Option<usize>,
}

impl LogFilter {
    #[must_use]
    pub const fn with_source(mut self, source: LogSource) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Apply the filter to entries in arrival order.
    ///
    /// Returns at most `limit` of the most recent matches, still in arrival order.
    pub fn apply<I>(&self, entries: I) -> Vec<LogEntry>
    where
        I: IntoIterator<Item = LogEntry>,
    {
        let needle = self
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut matched: Vec<LogEntry> = entries
            .into_iter()
            .filter(|entry| self.source.is_none_or(|source| entry.source == source))
            .filter(|entry| {
                needle
                    .as_deref()
                    .is_none_or(|n| entry.message.to_lowercase().contains(n))
            })
            .collect();

        let limit = self.limit.unwrap_or(DEFAULT_LOG_LIMIT);
        if matched.len() > limit {
            matched.drain(..matched.len() - limit);
        }
        matched
    }
}
