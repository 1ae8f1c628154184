//! CLI-specific error types and mappings.
//!
//! Maps supervisor and config errors to exit codes and user-facing messages.

use blockhost_core::SupervisorError;
use thiserror::Error;

use crate::config::ConfigError;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// The server id is unknown.
    #[error("{0}")]
    NotFound(String),

    /// The server is not in a state that allows the operation.
    #[error("{0}")]
    State(String),

    /// Argument parsing error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (missing artifact, unreadable log, broken pipe).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Record store error.
    #[error("Store error: {0}")]
    Store(String),

    /// Process execution error.
    #[error("Process error: {0}")]
    Process(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::State(_) => 1,
            Self::Arguments(_) => 2,  // EX_USAGE
            Self::NotFound(_) => 67,  // EX_NOUSER (closest fit)
            Self::Process(_) => 71,   // EX_OSERR
            Self::Io(_) => 74,        // EX_IOERR
            Self::Store(_) => 75,     // EX_TEMPFAIL
            Self::Config(_) => 78,    // EX_CONFIG
        }
    }
}

impl From<SupervisorError> for CliError {
    fn from(err: SupervisorError) -> Self {
        let message = err.to_string();
        match err {
            SupervisorError::NotFound(_) => Self::NotFound(message),
            SupervisorError::AlreadyRunning(_) | SupervisorError::NotRunning(_) => {
                Self::State(message)
            }
            SupervisorError::MissingArtifact { .. } | SupervisorError::IoFailure { .. } => {
                Self::Io(message)
            }
            SupervisorError::SpawnFailure { .. } => Self::Process(message),
            SupervisorError::Store(_) => Self::Store(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockhost_core::RepositoryError;
    use std::path::PathBuf;

    #[test]
    fn test_supervisor_errors_map_to_exit_codes() {
        let cases = [
            (SupervisorError::NotFound("a".into()), 67),
            (SupervisorError::AlreadyRunning("a".into()), 1),
            (SupervisorError::NotRunning("a".into()), 1),
            (
                SupervisorError::MissingArtifact {
                    id: "a".into(),
                    path: PathBuf::from("/srv/a/server.jar"),
                },
                74,
            ),
            (
                SupervisorError::SpawnFailure {
                    id: "a".into(),
                    reason: "denied".into(),
                },
                71,
            ),
            (
                SupervisorError::Store(RepositoryError::Storage("down".into())),
                75,
            ),
        ];

        for (err, code) in cases {
            assert_eq!(CliError::from(err).exit_code(), code);
        }
    }

    #[test]
    fn test_message_is_preserved() {
        let err = CliError::from(SupervisorError::NotRunning("lobby".into()));
        assert_eq!(err.to_string(), "Server lobby is not running");
    }
}
