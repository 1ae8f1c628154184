//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter:
//! - Config store (in-memory, loaded from the config file)
//! - Event broadcaster (tokio broadcast channel)
//! - Resource sampler (none wired in; status reports no usage)
//! - Server registry (via blockhost-runtime)

use std::sync::Arc;

use blockhost_core::UnavailableSampler;
use blockhost_runtime::{MemoryConfigStore, ServerRegistry, TokioBroadcaster};
use tracing::debug;

use crate::config::CliConfig;

/// Fully composed application context for CLI commands.
pub struct CliContext {
    pub registry: ServerRegistry,
    pub store: Arc<MemoryConfigStore>,
    pub broadcaster: Arc<TokioBroadcaster>,
}

/// Compose the registry from a loaded configuration.
///
/// Must be called inside a tokio runtime.
pub fn bootstrap(config: CliConfig) -> CliContext {
    debug!(servers = config.servers.len(), "Bootstrapping registry");
    let store = Arc::new(MemoryConfigStore::with_servers(config.servers));
    let broadcaster = Arc::new(TokioBroadcaster::new());
    let registry = ServerRegistry::new(
        config.settings,
        store.clone(),
        Arc::new(UnavailableSampler),
        broadcaster.clone(),
    );

    CliContext {
        registry,
        store,
        broadcaster,
    }
}
