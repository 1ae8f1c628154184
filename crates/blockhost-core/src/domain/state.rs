//! Lifecycle state and the status views handed to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Stopped,
    Starting,
    Running,
    Stopping,
    /// Exited unexpectedly while no stop was requested.
    Crashed,
}

impl LifecycleState {
    /// True while a process is spawned for the server.
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Starting | Self::Running | Self::Stopping)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Crashed => "crashed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata about a spawned process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub server_id: String,
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
}

/// A resource usage sample from the external sampler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    /// CPU usage in percent of one core.
    pub cpu_percent: f64,
    /// Resident memory in bytes.
    pub memory_bytes: u64,
}

/// How a process ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitReport {
    pub server_id: String,
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    /// `Stopped` or `Crashed`.
    pub state: LifecycleState,
    /// True if the process had to be killed.
    pub forced: bool,
    pub exited_at: DateTime<Utc>,
}

impl ExitReport {
    pub const fn crashed(&self) -> bool {
        matches!(self.state, LifecycleState::Crashed)
    }
}

/// Detailed status of one server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub server_id: String,
    pub state: LifecycleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<ResourceUsage>,
    /// How the most recent process for this server ended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_exit: Option<ExitReport>,
}

/// One row of the server listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSummary {
    pub server_id: String,
    pub state: LifecycleState,
    /// Seconds since start while running, else 0.
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_states() {
        assert!(LifecycleState::Starting.is_live());
        assert!(LifecycleState::Running.is_live());
        assert!(LifecycleState::Stopping.is_live());
        assert!(!LifecycleState::Stopped.is_live());
        assert!(!LifecycleState::Crashed.is_live());
    }

    #[test]
    fn state_serializes_lowercase() {
        let json = serde_json::to_string(&LifecycleState::Crashed).unwrap();
        assert_eq!(json, "\"crashed\"");
    }
}
