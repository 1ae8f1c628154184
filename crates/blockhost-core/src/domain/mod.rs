//! Domain types for managed server instances.

mod log;
mod server;
mod state;

pub use log::{DEFAULT_LOG_LIMIT, LogEntry, LogFilter, LogSource};
pub use server::{DEFAULT_EXECUTABLE, LaunchKind, LaunchTarget, MemoryBounds, ServerConfig};
pub use state::{
    ExitReport, LifecycleState, ProcessInfo, ResourceUsage, ServerStatus, ServerSummary,
};
