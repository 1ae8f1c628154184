//! Port definitions (trait abstractions) for external collaborators.
//!
//! The supervisor depends on three collaborators it does not implement:
//! the config/record store, the resource sampler, and the broadcast channel.
//!
//! # Design Rules
//!
//! - Only domain types in signatures
//! - Every port is `Send + Sync` so it can be shared as `Arc<dyn ...>`

mod broadcast;
mod config_store;
mod resource_sampler;

use std::path::PathBuf;
use thiserror::Error;

pub use broadcast::{BroadcastPort, NoopBroadcast};
pub use config_store::ConfigStorePort;
pub use resource_sampler::{ResourceSamplerPort, UnavailableSampler};

#[cfg(feature = "mock")]
pub use broadcast::MockBroadcastPort;
#[cfg(feature = "mock")]
pub use config_store::MockConfigStorePort;
#[cfg(feature = "mock")]
pub use resource_sampler::MockResourceSamplerPort;

/// Errors from the config/record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// The requested entity was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Errors from the resource sampler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SamplerError {
    /// No sample is available for the server right now.
    #[error("Resource usage unavailable")]
    Unavailable,

    #[error("Sampler failed: {0}")]
    Failed(String),
}

/// Errors returned by supervisor operations.
///
/// A stop that had to escalate to a kill is not an error; it is reported
/// through `ExitReport::forced`. Crashes are reported as status events.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The identifier has no known configuration.
    #[error("Server not found: {0}")]
    NotFound(String),

    /// A process is already spawned for the identifier.
    #[error("Server {0} is already running")]
    AlreadyRunning(String),

    /// No process is spawned for the identifier.
    #[error("Server {0} is not running")]
    NotRunning(String),

    /// The working directory or launch artifact is absent.
    #[error("Missing artifact for server {id}: {}", path.display())]
    MissingArtifact { id: String, path: PathBuf },

    /// The OS refused to create the process.
    #[error("Failed to spawn server {id}: {reason}")]
    SpawnFailure { id: String, reason: String },

    /// Reading or writing a process stream or file failed.
    #[error("I/O failure for server {id}: {reason}")]
    IoFailure { id: String, reason: String },

    /// The record store failed.
    #[error("Store error: {0}")]
    Store(#[from] RepositoryError),
}

impl SupervisorError {
    /// Map a store error for `id`, turning `NotFound` into [`SupervisorError::NotFound`].
    pub fn from_store(id: &str, err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(_) => Self::NotFound(id.to_string()),
            other => Self::Store(other),
        }
    }

    pub fn io(id: &str, err: &std::io::Error) -> Self {
        Self::IoFailure {
            id: id.to_string(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_maps_to_not_found() {
        let err = SupervisorError::from_store("alpha", RepositoryError::NotFound("alpha".into()));
        assert!(matches!(err, SupervisorError::NotFound(id) if id == "alpha"));
    }

    #[test]
    fn store_failure_keeps_source() {
        let err = SupervisorError::from_store("alpha", RepositoryError::Storage("disk".into()));
        assert_eq!(err.to_string(), "Store error: Storage error: disk");
    }

    #[test]
    fn missing_artifact_message_includes_path() {
        let err = SupervisorError::MissingArtifact {
            id: "alpha".into(),
            path: PathBuf::from("/srv/alpha/server.jar"),
        };
        assert!(err.to_string().contains("/srv/alpha/server.jar"));
    }
}
