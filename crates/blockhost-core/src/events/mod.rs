//! Server events published on the broadcast port.
//!
//! Each server has two topics: one carrying captured log entries and one
//! carrying lifecycle transitions. Subscribers should treat status events as
//! the source of truth for lifecycle and order them by `updated_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{LifecycleState, LogEntry};

/// Topic carrying log entries for a server.
pub fn log_topic(server_id: &str) -> String {
    format!("server:{server_id}:logs")
}

/// Topic carrying lifecycle transitions for a server.
pub fn status_topic(server_id: &str) -> String {
    format!("server:{server_id}:status")
}

/// A lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub server_id: String,
    pub state: LifecycleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// Exit code for `Stopped`/`Crashed` transitions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

/// Event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEvent {
    /// A captured log entry.
    Log { server_id: String, entry: LogEntry },
    /// A lifecycle transition.
    Status(StatusChange),
}

impl ServerEvent {
    pub fn log(server_id: impl Into<String>, entry: LogEntry) -> Self {
        Self::Log {
            server_id: server_id.into(),
            entry,
        }
    }

    pub fn status(server_id: impl Into<String>, state: LifecycleState, pid: Option<u32>) -> Self {
        Self::Status(StatusChange {
            server_id: server_id.into(),
            state,
            pid,
            exit_code: None,
            updated_at: Utc::now(),
        })
    }

    pub fn exited(server_id: impl Into<String>, state: LifecycleState, exit_code: Option<i32>) -> Self {
        Self::Status(StatusChange {
            server_id: server_id.into(),
            state,
            pid: None,
            exit_code,
            updated_at: Utc::now(),
        })
    }

    /// The server this event belongs to.
    pub fn server_id(&self) -> &str {
        match self {
            Self::Log { server_id, .. } => server_id,
            Self::Status(change) => &change.server_id,
        }
    }

    /// The topic this event is published on.
    pub fn topic(&self) -> String {
        match self {
            Self::Log { server_id, .. } => log_topic(server_id),
            Self::Status(change) => status_topic(&change.server_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LogSource;

    #[test]
    fn status_event_serialization() {
        let event = ServerEvent::status("alpha", LifecycleState::Running, Some(42));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"status\""));
        assert!(json.contains("\"serverId\":\"alpha\""));
        assert!(json.contains("\"state\":\"running\""));
        assert!(!json.contains("exitCode"));
    }

    #[test]
    fn topics_follow_event_kind() {
        let log = ServerEvent::log("alpha", LogEntry::new(LogSource::Stdout, "hi"));
        assert_eq!(log.topic(), "server:alpha:logs");

        let exited = ServerEvent::exited("alpha", LifecycleState::Crashed, Some(1));
        assert_eq!(exited.topic(), "server:alpha:status");
        assert_eq!(exited.server_id(), "alpha");
    }
}
