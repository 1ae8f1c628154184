//! Core domain types and port definitions for blockhost.
//!
//! This crate holds everything the supervisor needs that does not touch an
//! OS process: server configuration, log entries and filters, lifecycle
//! state, events, the collaborator ports, settings and the properties
//! overlay.
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod events;
pub mod paths;
pub mod ports;
pub mod properties;
pub mod settings;

pub use domain::{
    DEFAULT_LOG_LIMIT, ExitReport, LaunchKind, LaunchTarget, LifecycleState, LogEntry, LogFilter,
    LogSource, MemoryBounds, ProcessInfo, ResourceUsage, ServerConfig, ServerStatus,
    ServerSummary,
};
pub use events::{ServerEvent, StatusChange, log_topic, status_topic};
pub use ports::{
    BroadcastPort, ConfigStorePort, NoopBroadcast, RepositoryError, ResourceSamplerPort,
    SamplerError, SupervisorError, UnavailableSampler,
};
pub use properties::{PROPERTIES_FILE, PropertyOverlay};
pub use settings::{SettingsError, SupervisorSettings, validate_settings};

// serde_json is only used by unit tests
#[cfg(test)]
use serde_json as _;
