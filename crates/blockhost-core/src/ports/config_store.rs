//! Config/record store port.
//!
//! The store owns server configuration and the persisted start/stop
//! timestamps. The supervisor only reads configuration and records
//! timestamps; it never assumes exclusive access.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::RepositoryError;
use crate::domain::ServerConfig;

/// Record store for server configuration.
///
/// # Design Rules
///
/// - No storage types in signatures
/// - Calls may be slow or fail; callers must not hold their own locks across them
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait ConfigStorePort: Send + Sync {
    /// Fetch the configuration for a server.
    ///
    /// Returns `Err(RepositoryError::NotFound)` for unknown identifiers.
    async fn get(&self, id: &str) -> Result<ServerConfig, RepositoryError>;

    /// List every configured identifier in the store's own order.
    async fn list_ids(&self) -> Result<Vec<String>, RepositoryError>;

    /// Record when a server process was started.
    async fn set_started(&self, id: &str, at: DateTime<Utc>) -> Result<(), RepositoryError>;

    /// Record when a server process exited.
    async fn set_stopped(&self, id: &str, at: DateTime<Utc>) -> Result<(), RepositoryError>;
}
