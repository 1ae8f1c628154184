//! Server shutdown.
//!
//! - `StopProtocol`: stop command on stdin, kill after a timeout
//! - `pid_alive`: liveness probe used when a stdin write fails

mod liveness;
mod stop;

pub use liveness::pid_alive;
pub use stop::StopProtocol;
