//! Process supervision for game servers.
//!
//! # Structure
//!
//! - `ServerRegistry` - start/stop/command/status/logs for every server
//! - `ProcessHandle` - one spawned process and its lifecycle state
//! - `LogBuffer` / `LogSink` - bounded per-server log capture
//! - `LogFileReader` - persisted log parsing for stopped servers
//! - `StopProtocol` - stop command with kill escalation
//! - `TokioBroadcaster` - in-process event fan-out

mod broadcaster;
pub mod command;
mod handle;
mod log_buffer;
mod log_file;
mod registry;
pub mod shutdown;
mod sink;
mod stream;

pub use broadcaster::{CHANNEL_CAPACITY, TokioBroadcaster, TopicEvent};
pub use handle::ProcessHandle;
pub use log_buffer::LogBuffer;
pub use log_file::{LogFileReader, parse_line};
pub use registry::{ServerRegistry, StopOutcome};
pub use shutdown::{StopProtocol, pid_alive};
pub use sink::LogSink;
