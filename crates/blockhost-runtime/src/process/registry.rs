//! Server registry: the supervisor's public surface.
//!
//! Maps each server identifier to at most one [`ProcessHandle`]. A handle is
//! inserted by `start` and removed only by the reaper task when the process
//! exit is observed; callers never remove handles directly.
//!
//! # Locking
//!
//! - A per-identifier async mutex serializes `start`, `update_properties`
//!   and the exit removal for that identifier.
//! - The handle map is only locked briefly for lookups and insert/remove;
//!   store and sampler calls never run while it is held.

use async_stream::stream;
use blockhost_core::{
    BroadcastPort, ConfigStorePort, ExitReport, LifecycleState, LogFilter, LogEntry, LogSource,
    PROPERTIES_FILE, ProcessInfo, PropertyOverlay, RepositoryError, ResourceSamplerPort,
    ServerEvent, ServerStatus, ServerSummary, SupervisorError, SupervisorSettings, properties,
    status_topic,
};
use chrono::Utc;
use futures_util::Stream;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::{debug, info, warn};

use super::command::{spawn, sync_properties, verify_launch};
use super::handle::{ExitNotice, ProcessHandle, spawn_exit_watcher};
use super::log_file::LogFileReader;
use super::shutdown::StopProtocol;
use super::sink::LogSink;
use super::stream::spawn_stream_reader;

/// Outcome of one server in [`ServerRegistry::stop_all`].
pub type StopOutcome = (String, Result<ExitReport, SupervisorError>);

/// Concurrent-safe registry of running servers.
///
/// Cheap to clone; clones share the same state. Must be created inside a
/// tokio runtime because it spawns its reaper task.
#[derive(Clone)]
pub struct ServerRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    settings: SupervisorSettings,
    store: Arc<dyn ConfigStorePort>,
    sampler: Arc<dyn ResourceSamplerPort>,
    broadcast: Arc<dyn BroadcastPort>,
    stop: StopProtocol,
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
    handles: RwLock<HashMap<String, Arc<ProcessHandle>>>,
    last_exits: RwLock<HashMap<String, ExitReport>>,
    exits: mpsc::UnboundedSender<ExitNotice>,
}

impl ServerRegistry {
    pub fn new(
        settings: SupervisorSettings,
        store: Arc<dyn ConfigStorePort>,
        sampler: Arc<dyn ResourceSamplerPort>,
        broadcast: Arc<dyn BroadcastPort>,
    ) -> Self {
        let (exits, notices) = mpsc::unbounded_channel();
        let stop = StopProtocol::new(
            settings.stop_command.clone(),
            settings.stop_timeout(),
            Arc::clone(&broadcast),
        );
        let inner = Arc::new(RegistryInner {
            settings,
            store,
            sampler,
            broadcast,
            stop,
            locks: StdMutex::new(HashMap::new()),
            handles: RwLock::new(HashMap::new()),
            last_exits: RwLock::new(HashMap::new()),
            exits,
        });
        tokio::spawn(run_reaper(Arc::downgrade(&inner), notices));
        Self { inner }
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.inner.settings
    }

    /// Start the server `id`.
    ///
    /// Fails with `AlreadyRunning` if a process is spawned for `id`. A failed
    /// start leaves no handle behind.
    pub async fn start(&self, id: &str) -> Result<ProcessInfo, SupervisorError> {
        let inner = &self.inner;
        let lock = inner.id_lock(id);
        let _guard = lock.lock().await;

        if inner.handles.read().await.contains_key(id) {
            return Err(SupervisorError::AlreadyRunning(id.to_string()));
        }

        let mut config = inner
            .store
            .get(id)
            .await
            .map_err(|e| SupervisorError::from_store(id, e))?;
        // The registry key is authoritative.
        config.id = id.to_string();

        verify_launch(&config)?;
        sync_properties(&config)?;
        let mut child = spawn(&config)?;
        let pid = child.id();

        let logs = Arc::new(LogSink::new(
            id,
            inner.settings.log_capacity,
            Arc::clone(&inner.broadcast),
        ));
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_stream_reader(stdout, LogSource::Stdout, Arc::clone(&logs)));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_stream_reader(stderr, LogSource::Stderr, Arc::clone(&logs)));
        }

        let handle = Arc::new(ProcessHandle::new(config, pid, child.stdin.take(), logs));
        inner
            .handles
            .write()
            .await
            .insert(id.to_string(), Arc::clone(&handle));
        inner.publish_status(&handle, LifecycleState::Starting);

        spawn_exit_watcher(child, Arc::clone(&handle), readers, inner.exits.clone());

        info!(server_id = %id, pid = ?pid, "Server started");
        handle.logs().system(match pid {
            Some(pid) => format!("Server started with pid {pid}"),
            None => "Server started".to_string(),
        });

        inner
            .persist(&handle, "start time", inner.store.set_started(id, handle.started_at()))
            .await;

        if handle.mark_running() {
            inner.publish_status(&handle, LifecycleState::Running);
        }

        Ok(handle.info())
    }

    /// Stop the server `id` and wait for the process to exit.
    ///
    /// Without `force` the stop command is sent first and the process is
    /// killed only if it outlives the stop timeout. Concurrent callers share
    /// one stop sequence and receive the same report.
    pub async fn stop(&self, id: &str, force: bool) -> Result<ExitReport, SupervisorError> {
        let handle = self
            .inner
            .handle(id)
            .await
            .ok_or_else(|| SupervisorError::NotRunning(id.to_string()))?;

        let report = if force {
            self.inner.stop.kill(&handle).await
        } else {
            self.inner.stop.stop(&handle).await
        };
        Ok(report)
    }

    /// Gracefully stop every running server concurrently.
    pub async fn stop_all(&self) -> Vec<StopOutcome> {
        let ids: Vec<String> = self.inner.handles.read().await.keys().cloned().collect();
        if ids.is_empty() {
            return Vec::new();
        }
        info!(count = ids.len(), "Stopping all servers");

        join_all(ids.into_iter().map(|id| async move {
            let result = self.stop(&id, false).await;
            (id, result)
        }))
        .await
    }

    /// Write a console command to the server's stdin.
    pub async fn send_command(&self, id: &str, text: &str) -> Result<(), SupervisorError> {
        let handle = self
            .inner
            .handle(id)
            .await
            .filter(|h| !h.has_exited())
            .ok_or_else(|| SupervisorError::NotRunning(id.to_string()))?;

        handle.logs().append(LogSource::Command, text);
        if let Err(e) = handle.write_line(text).await {
            handle
                .logs()
                .system(format!("Failed to send command: {e}"));
            if !handle.confirm_alive().await {
                return Err(SupervisorError::NotRunning(id.to_string()));
            }
            return Err(SupervisorError::io(id, &e));
        }
        debug!(server_id = %id, command = text, "Command sent");
        Ok(())
    }

    /// Query logs from the live buffer, or from the persisted log file when
    /// the server is not running.
    pub async fn get_logs(&self, id: &str, filter: &LogFilter) -> Result<Vec<LogEntry>, SupervisorError> {
        let mut filter = filter.clone();
        if filter.limit.is_none() {
            filter.limit = Some(self.inner.settings.default_log_limit);
        }

        if let Some(handle) = self.inner.handle(id).await {
            return Ok(handle.logs().query(&filter));
        }

        let config = self
            .inner
            .store
            .get(id)
            .await
            .map_err(|e| SupervisorError::from_store(id, e))?;
        let reader = LogFileReader::new(config.resolve(&self.inner.settings.log_file));
        reader
            .read(&filter)
            .await
            .map_err(|e| SupervisorError::io(id, &e))
    }

    /// Current state of the server `id`.
    ///
    /// A server with no process reports the state its last process ended in,
    /// or `Stopped` if it never ran.
    pub async fn status(&self, id: &str) -> Result<ServerStatus, SupervisorError> {
        let handle = self.inner.handle(id).await;
        if handle.is_none() {
            self.inner
                .store
                .get(id)
                .await
                .map_err(|e| SupervisorError::from_store(id, e))?;
        }
        let last_exit = self.inner.last_exits.read().await.get(id).cloned();

        let Some(handle) = handle else {
            return Ok(ServerStatus {
                server_id: id.to_string(),
                state: last_exit
                    .as_ref()
                    .map_or(LifecycleState::Stopped, |r| r.state),
                process: None,
                usage: None,
                last_exit,
            });
        };

        let usage = match self.inner.sampler.sample(id).await {
            Ok(usage) => Some(usage),
            Err(e) => {
                debug!(server_id = %id, error = %e, "No resource sample");
                None
            }
        };

        Ok(ServerStatus {
            server_id: id.to_string(),
            state: handle.state(),
            process: Some(handle.info()),
            usage,
            last_exit,
        })
    }

    /// Summaries for every configured server, in the store's order.
    ///
    /// The stream is lazy: the store is queried when it is first polled, and
    /// each call returns a fresh stream.
    pub fn list_all(&self) -> impl Stream<Item = Result<ServerSummary, SupervisorError>> + Send + 'static {
        let inner = Arc::clone(&self.inner);
        stream! {
            let ids = match inner.store.list_ids().await {
                Ok(ids) => ids,
                Err(e) => {
                    yield Err(SupervisorError::from(e));
                    return;
                }
            };

            for id in ids {
                let handle = inner.handle(&id).await;
                let summary = match handle {
                    Some(handle) => {
                        let state = handle.state();
                        let uptime_secs = if state == LifecycleState::Running {
                            handle.uptime_secs(Utc::now())
                        } else {
                            0
                        };
                        ServerSummary { server_id: id, state, uptime_secs }
                    }
                    None => ServerSummary {
                        server_id: id,
                        state: LifecycleState::Stopped,
                        uptime_secs: 0,
                    },
                };
                yield Ok(summary);
            }
        }
    }

    /// Merge `overlay` into the server's `server.properties`; new values win.
    ///
    /// Returns the merged file contents.
    pub async fn update_properties(
        &self,
        id: &str,
        overlay: &PropertyOverlay,
    ) -> Result<PropertyOverlay, SupervisorError> {
        let lock = self.inner.id_lock(id);
        let _guard = lock.lock().await;

        let working_dir = match self.inner.handle(id).await {
            Some(handle) => handle.config().working_dir.clone(),
            None => {
                self.inner
                    .store
                    .get(id)
                    .await
                    .map_err(|e| SupervisorError::from_store(id, e))?
                    .working_dir
            }
        };

        let path = working_dir.join(PROPERTIES_FILE);
        let merged =
            properties::apply_overlay(&path, overlay).map_err(|e| SupervisorError::io(id, &e))?;
        info!(server_id = %id, keys = overlay.len(), path = %path.display(), "Updated server properties");
        Ok(merged)
    }

    pub async fn is_running(&self, id: &str) -> bool {
        self.inner.handles.read().await.contains_key(id)
    }

    /// Identifiers with a spawned process.
    pub async fn running_ids(&self) -> Vec<String> {
        self.inner.handles.read().await.keys().cloned().collect()
    }
}

impl RegistryInner {
    fn id_lock(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id.to_string()).or_default())
    }

    async fn handle(&self, id: &str) -> Option<Arc<ProcessHandle>> {
        self.handles.read().await.get(id).cloned()
    }

    fn publish_status(&self, handle: &ProcessHandle, state: LifecycleState) {
        let id = handle.server_id();
        self.broadcast
            .publish(&status_topic(id), ServerEvent::status(id, state, handle.pid()));
    }

    /// Run a store write, logging failures instead of propagating them.
    async fn persist<F>(&self, handle: &ProcessHandle, what: &str, write: F)
    where
        F: Future<Output = Result<(), RepositoryError>>,
    {
        let id = handle.server_id();
        match tokio::time::timeout(self.settings.store_timeout(), write).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(server_id = %id, error = %e, "Failed to record {what}");
                handle.logs().system(format!("Failed to record {what}: {e}"));
            }
            Err(_) => {
                warn!(server_id = %id, timeout_secs = self.settings.store_timeout_secs, "Timed out recording {what}");
                handle.logs().system(format!("Timed out recording {what}"));
            }
        }
    }

    /// Process an exit notification: record it, remove the handle, release waiters.
    async fn reap(&self, notice: ExitNotice) {
        let ExitNotice {
            handle,
            status,
            report,
        } = notice;
        let id = handle.server_id().to_string();
        let lock = self.id_lock(&id);
        let _guard = lock.lock().await;

        handle.set_state(report.state);
        handle.logs().system(match (&status, report.code) {
            (Err(e), _) => format!("Lost track of process: {e}"),
            (Ok(_), Some(code)) => format!("Process exited with code {code}"),
            (Ok(_), None) => "Process terminated by signal".to_string(),
        });

        // Record the exit before removal so a reader never sees neither.
        self.last_exits
            .write()
            .await
            .insert(id.clone(), report.clone());
        {
            let mut handles = self.handles.write().await;
            if handles.get(&id).is_some_and(|h| Arc::ptr_eq(h, &handle)) {
                handles.remove(&id);
            }
        }

        self.persist(&handle, "stop time", self.store.set_stopped(&id, report.exited_at))
            .await;

        self.broadcast.publish(
            &status_topic(&id),
            ServerEvent::exited(&id, report.state, report.code),
        );

        if report.crashed() {
            warn!(server_id = %id, code = ?report.code, "Server crashed");
        } else {
            info!(server_id = %id, code = ?report.code, forced = report.forced, "Server stopped");
        }

        handle.complete(report);
    }
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        for handle in self.handles.get_mut().values() {
            handle.kill("supervisor shutting down");
        }
    }
}

/// Receive exit notifications and reap each one in its own task.
///
/// Ends once every exit watcher and the registry have dropped their senders.
async fn run_reaper(registry: Weak<RegistryInner>, mut notices: mpsc::UnboundedReceiver<ExitNotice>) {
    while let Some(notice) = notices.recv().await {
        match registry.upgrade() {
            Some(inner) => {
                tokio::spawn(async move { inner.reap(notice).await });
            }
            None => notice.handle.complete(notice.report),
        }
    }
    debug!("Reaper exiting");
}
