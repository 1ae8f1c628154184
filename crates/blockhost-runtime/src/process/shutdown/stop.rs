//! Graceful stop with kill escalation.
//!
//! # Strategy
//! 1. Write the stop command to the server's stdin
//! 2. Wait up to `timeout` for the OS to report the process exit
//! 3. If still running, kill it and wait for the exit to be reaped
//!
//! The protocol runs in its own task, claimed by the first caller, so the
//! timer keeps running even if that caller goes away. Every caller waits on
//! the handle's exit signal and so observes the same [`ExitReport`].

use blockhost_core::{BroadcastPort, ExitReport, LifecycleState, ServerEvent, status_topic};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::process::handle::ProcessHandle;

/// Stop policy shared by every server in a registry.
pub struct StopProtocol {
    command: String,
    timeout: Duration,
    broadcast: Arc<dyn BroadcastPort>,
}

impl StopProtocol {
    pub fn new(command: impl Into<String>, timeout: Duration, broadcast: Arc<dyn BroadcastPort>) -> Self {
        Self {
            command: command.into(),
            timeout,
            broadcast,
        }
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Stop gracefully, escalating to a kill after the timeout.
    ///
    /// Returns once the process has exited and the registry has removed it.
    pub async fn stop(&self, handle: &Arc<ProcessHandle>) -> ExitReport {
        self.announce_stopping(handle);

        if handle.claim_stop_driver() {
            let driver = Arc::clone(handle);
            let command = self.command.clone();
            let timeout = self.timeout;
            tokio::spawn(async move { drive(driver, command, timeout).await });
        } else {
            debug!(server_id = %handle.server_id(), "Stop already in progress, waiting for exit");
        }

        handle.wait_exit().await
    }

    /// Kill immediately and wait for the exit to be reaped.
    pub async fn kill(&self, handle: &Arc<ProcessHandle>) -> ExitReport {
        self.announce_stopping(handle);
        handle.kill("forced stop requested");
        handle.wait_exit().await
    }

    fn announce_stopping(&self, handle: &ProcessHandle) {
        if handle.mark_stopping() {
            let id = handle.server_id();
            self.broadcast.publish(
                &status_topic(id),
                ServerEvent::status(id, LifecycleState::Stopping, handle.pid()),
            );
        }
    }
}

async fn drive(handle: Arc<ProcessHandle>, command: String, timeout: Duration) {
    let id = handle.server_id().to_string();
    if handle.process_exited() {
        debug!(server_id = %id, "Process already exited, nothing to stop");
        return;
    }
    info!(server_id = %id, timeout_secs = timeout.as_secs_f64(), "Sending stop command");
    handle.logs().system(format!("Sending stop command: {command}"));

    if let Err(e) = handle.write_line(&command).await {
        // The timer below still bounds how long we wait.
        debug!(server_id = %id, error = %e, "Failed to write stop command");
        handle
            .logs()
            .system(format!("Failed to send stop command: {e}"));
    }

    if tokio::time::timeout(timeout, handle.wait_process_exit()).await.is_ok() {
        debug!(server_id = %id, "Server stopped gracefully");
        return;
    }

    handle.kill(&format!(
        "did not stop within {:.1}s",
        timeout.as_secs_f64()
    ));
}
