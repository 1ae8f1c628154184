//! Supervisor settings and validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default capacity of the per-server log buffer.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// Default grace period before a stop escalates to a kill.
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 30;

/// Default console command that asks a server to shut down.
pub const DEFAULT_STOP_COMMAND: &str = "stop";

/// Default path of the persisted log, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "logs/latest.log";

/// Default upper bound on store calls made while reaping an exited process.
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 5;

/// Supervisor settings.
///
/// Missing fields fall back to their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorSettings {
    /// Maximum entries kept in each server's log buffer.
    pub log_capacity: usize,
    /// Seconds to wait for a graceful stop before killing.
    pub stop_timeout_secs: u64,
    /// Command written to stdin to request a graceful stop.
    pub stop_command: String,
    /// Entries returned by a log query without an explicit limit.
    pub default_log_limit: usize,
    /// Persisted log read when the server is not running.
    pub log_file: PathBuf,
    /// Seconds allowed for store calls on the exit path.
    pub store_timeout_secs: u64,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
            stop_timeout_secs: DEFAULT_STOP_TIMEOUT_SECS,
            stop_command: DEFAULT_STOP_COMMAND.to_string(),
            default_log_limit: crate::domain::DEFAULT_LOG_LIMIT,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            store_timeout_secs: DEFAULT_STORE_TIMEOUT_SECS,
        }
    }
}

impl SupervisorSettings {
    pub const fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    pub const fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}

/// Settings validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("log_capacity must be at least 1")]
    ZeroLogCapacity,

    #[error("default_log_limit must be at least 1")]
    ZeroLogLimit,

    #[error("stop_timeout_secs must be at least 1")]
    ZeroStopTimeout,

    #[error("store_timeout_secs must be at least 1")]
    ZeroStoreTimeout,

    #[error("stop_command cannot be empty")]
    EmptyStopCommand,

    #[error("log_file cannot be empty")]
    EmptyLogFile,
}

/// Validate settings before handing them to the supervisor.
pub fn validate_settings(settings: &SupervisorSettings) -> Result<(), SettingsError> {
    if settings.log_capacity == 0 {
        return Err(SettingsError::ZeroLogCapacity);
    }
    if settings.default_log_limit == 0 {
        return Err(SettingsError::ZeroLogLimit);
    }
    if settings.stop_timeout_secs == 0 {
        return Err(SettingsError::ZeroStopTimeout);
    }
    if settings.store_timeout_secs == 0 {
        return Err(SettingsError::ZeroStoreTimeout);
    }
    if settings.stop_command.trim().is_empty() {
        return Err(SettingsError::EmptyStopCommand);
    }
    if settings.log_file.as_os_str().is_empty() {
        return Err(SettingsError::EmptyLogFile);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = SupervisorSettings::default();
        assert!(validate_settings(&settings).is_ok());
        assert_eq!(settings.stop_timeout(), Duration::from_secs(30));
        assert_eq!(settings.log_capacity, 1000);
        assert_eq!(settings.default_log_limit, 100);
    }

    #[test]
    fn rejects_zero_capacity() {
        let settings = SupervisorSettings {
            log_capacity: 0,
            ..Default::default()
        };
        assert_eq!(
            validate_settings(&settings),
            Err(SettingsError::ZeroLogCapacity)
        );
    }

    #[test]
    fn rejects_blank_stop_command() {
        let settings = SupervisorSettings {
            stop_command: "  ".into(),
            ..Default::default()
        };
        assert_eq!(
            validate_settings(&settings),
            Err(SettingsError::EmptyStopCommand)
        );
    }

    #[test]
    fn partial_json_uses_defaults() {
        let settings: SupervisorSettings =
            serde_json::from_str(r#"{"stop_timeout_secs": 10}"#).unwrap();
        assert_eq!(settings.stop_timeout_secs, 10);
        assert_eq!(settings.stop_command, "stop");
    }
}
