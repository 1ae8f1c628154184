//! A spawned server process.
//!
//! The handle is owned by the registry and shared with the tasks that serve
//! the process: two stream readers, the exit watcher and, while stopping,
//! the stop protocol. The `Child` itself is owned by the exit watcher; the
//! handle reaches it only through the kill token.
//!
//! Exit is signalled twice. `process_exit` fires as soon as the OS reports
//! the exit; the exit report is published once the registry has finished
//! reaping.

use blockhost_core::{ExitReport, LifecycleState, ProcessInfo, ServerConfig};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use std::io;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::shutdown::pid_alive;
use super::sink::LogSink;

/// How long a failed stdin write waits for the exit notification before
/// concluding the process is still alive.
const LIVENESS_GRACE: Duration = Duration::from_millis(250);

/// How long the exit watcher waits for the output readers to drain after
/// the process exits. Grandchildren holding the pipes open can keep them
/// alive past this.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Delivered to the registry when a process exits.
pub(crate) struct ExitNotice {
    pub handle: Arc<ProcessHandle>,
    pub status: io::Result<ExitStatus>,
    /// Classified when the exit was observed, before the output drained.
    pub report: ExitReport,
}

/// State the registry tracks for one spawned process.
pub struct ProcessHandle {
    config: ServerConfig,
    pid: Option<u32>,
    started_at: DateTime<Utc>,
    state: RwLock<LifecycleState>,
    logs: Arc<LogSink>,
    stdin: Mutex<Option<ChildStdin>>,
    kill: CancellationToken,
    process_exit: CancellationToken,
    stop_requested: AtomicBool,
    stop_driver_claimed: AtomicBool,
    forced: AtomicBool,
    exit: watch::Sender<Option<ExitReport>>,
}

impl ProcessHandle {
    pub(crate) fn new(
        config: ServerConfig,
        pid: Option<u32>,
        stdin: Option<ChildStdin>,
        logs: Arc<LogSink>,
    ) -> Self {
        let (exit, _) = watch::channel(None);
        Self {
            config,
            pid,
            started_at: Utc::now(),
            state: RwLock::new(LifecycleState::Starting),
            logs,
            stdin: Mutex::new(stdin),
            kill: CancellationToken::new(),
            process_exit: CancellationToken::new(),
            stop_requested: AtomicBool::new(false),
            stop_driver_claimed: AtomicBool::new(false),
            forced: AtomicBool::new(false),
            exit,
        }
    }

    pub fn server_id(&self) -> &str {
        &self.config.id
    }

    /// Configuration snapshot taken at start.
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn logs(&self) -> &Arc<LogSink> {
        &self.logs
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_state(&self, state: LifecycleState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Move Starting to Running. Returns false if the state already moved on.
    pub(crate) fn mark_running(&self) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if *state == LifecycleState::Starting {
            *state = LifecycleState::Running;
            true
        } else {
            false
        }
    }

    /// Record that a stop was requested and move to Stopping.
    ///
    /// Returns true only for the call that performed the transition.
    pub(crate) fn mark_stopping(&self) -> bool {
        if self.process_exited() {
            return false;
        }
        self.stop_requested.store(true, Ordering::SeqCst);
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, LifecycleState::Starting | LifecycleState::Running) {
            *state = LifecycleState::Stopping;
            true
        } else {
            false
        }
    }

    /// Claim the right to run the graceful stop protocol. Only the first caller wins.
    pub(crate) fn claim_stop_driver(&self) -> bool {
        !self.stop_driver_claimed.swap(true, Ordering::SeqCst)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// True once the process was (or is being) killed.
    pub fn forced(&self) -> bool {
        self.forced.load(Ordering::SeqCst)
    }

    pub fn info(&self) -> ProcessInfo {
        ProcessInfo {
            server_id: self.config.id.clone(),
            pid: self.pid,
            started_at: self.started_at,
        }
    }

    pub fn uptime_secs(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((now - self.started_at).num_seconds()).unwrap_or(0)
    }

    /// Write one line to the process's stdin.
    ///
    /// A failed write closes our end of the pipe; later writes fail fast.
    pub(crate) async fn write_line(&self, line: &str) -> io::Result<()> {
        let mut guard = self.stdin.lock().await;
        let Some(stdin) = guard.as_mut() else {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdin is closed"));
        };

        let mut payload = Vec::with_capacity(line.len() + 1);
        payload.extend_from_slice(line.as_bytes());
        payload.push(b'\n');

        let result = match stdin.write_all(&payload).await {
            Ok(()) => stdin.flush().await,
            Err(e) => Err(e),
        };
        if result.is_err() {
            *guard = None;
        }
        result
    }

    /// Ask the exit watcher to kill the process.
    ///
    /// Only the first call sends a kill; later calls and calls after exit are no-ops.
    pub(crate) fn kill(&self, reason: &str) -> bool {
        if self.process_exited() {
            return false;
        }
        self.stop_requested.store(true, Ordering::SeqCst);
        if self.forced.swap(true, Ordering::SeqCst) {
            return false;
        }
        warn!(server_id = %self.config.id, pid = ?self.pid, reason, "Killing server process");
        self.logs.system(format!("Killing process: {reason}"));
        self.kill.cancel();
        true
    }

    /// True once the registry has finished processing the exit.
    pub fn has_exited(&self) -> bool {
        self.exit.borrow().is_some()
    }

    /// True as soon as the OS has reported the process exit.
    pub fn process_exited(&self) -> bool {
        self.process_exit.is_cancelled()
    }

    /// Wait for the OS to report the process exit.
    pub async fn wait_process_exit(&self) {
        self.process_exit.cancelled().await;
    }

    pub fn exit_report(&self) -> Option<ExitReport> {
        self.exit.borrow().clone()
    }

    /// Wait until the registry has finished processing the exit.
    pub async fn wait_exit(&self) -> ExitReport {
        let mut rx = self.exit.subscribe();
        loop {
            if let Some(report) = rx.borrow_and_update().as_ref() {
                return report.clone();
            }
            // `self` owns the sender, so the channel stays open while we wait.
            let _ = rx.changed().await;
        }
    }

    /// Best-effort check that the process is still running.
    pub(crate) async fn confirm_alive(&self) -> bool {
        if self.process_exited() || self.pid.is_some_and(|pid| !pid_alive(pid)) {
            return false;
        }
        tokio::time::timeout(LIVENESS_GRACE, self.wait_process_exit())
            .await
            .is_err()
    }

    /// Classify an exit.
    ///
    /// An exit nobody asked for is a crash unless the process exited cleanly.
    pub(crate) fn build_report(&self, status: &io::Result<ExitStatus>) -> ExitReport {
        let code = status.as_ref().ok().and_then(ExitStatus::code);
        let clean = matches!(status, Ok(s) if s.success());
        let state = if self.stop_requested() || clean {
            LifecycleState::Stopped
        } else {
            LifecycleState::Crashed
        };
        ExitReport {
            server_id: self.config.id.clone(),
            code,
            state,
            forced: self.forced(),
            exited_at: Utc::now(),
        }
    }

    /// Publish the final report to every waiter.
    pub(crate) fn complete(&self, report: ExitReport) {
        self.exit.send_replace(Some(report));
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("server_id", &self.config.id)
            .field("pid", &self.pid)
            .field("state", &self.state())
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

/// Spawn the task that owns `child`, waits for it to exit and notifies the registry.
///
/// The kill token makes the task kill the child; the exit that follows is
/// reported like any other. The notice is sent after `readers` finish, or
/// after [`DRAIN_GRACE`], so the exit entry follows the process's last output.
pub(crate) fn spawn_exit_watcher(
    mut child: Child,
    handle: Arc<ProcessHandle>,
    readers: Vec<JoinHandle<()>>,
    notices: mpsc::UnboundedSender<ExitNotice>,
) {
    let kill = handle.kill.clone();
    tokio::spawn(async move {
        let status = tokio::select! {
            status = child.wait() => status,
            () = kill.cancelled() => {
                if let Err(e) = child.start_kill() {
                    debug!(server_id = %handle.server_id(), error = %e, "start_kill failed, process likely already exited");
                }
                child.wait().await
            }
        };

        debug!(server_id = %handle.server_id(), status = ?status, "Process exited");
        handle.process_exit.cancel();
        let report = handle.build_report(&status);

        if tokio::time::timeout(DRAIN_GRACE, join_all(readers)).await.is_err() {
            debug!(server_id = %handle.server_id(), "Output still open after exit");
        }

        let notice = ExitNotice {
            handle,
            status,
            report,
        };
        if let Err(mpsc::error::SendError(notice)) = notices.send(notice) {
            // Registry is gone; release any waiters directly.
            notice.handle.complete(notice.report);
        }
    });
}
