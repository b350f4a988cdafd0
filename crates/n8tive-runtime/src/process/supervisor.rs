//! Supervisor for one long-running child service.
//!
//! The supervisor owns the child's state internally. Owners (tray shell,
//! CLI, IPC bridge) call `start`/`stop`/`restart` and learn about the child
//! only through the `SupervisorObserver` callbacks.
//!
//! Key design decisions:
//! - **Single state lock**: every transition happens under one mutex that is
//!   never held across an `.await` or an owner callback, so callbacks may
//!   query the supervisor and background events cannot race a transition
//! - **Lifecycle lock**: `start` claims `Starting` under the state lock, then
//!   spawns without it; `stop` waits for that window to close
//! - **Run ids**: each spawn gets a fresh id; exit and readiness events from
//!   an earlier run never touch a later one
//! - **Monitor owns the child**: one task waits on the `Child` and executes
//!   termination commands, so signals never target a reaped PID
//! - **Joined termination**: concurrent `stop` callers wait on the same exit
//!   confirmation instead of issuing a second kill sequence
//! - **Weak back-references**: background tasks hold `Weak<Shared>`, so
//!   dropping the last supervisor handle kills the child

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use n8tive_core::{
    LOOPBACK_HOST, LogSinkPort, LogSource, NetworkSettings, SupervisorError, SupervisorObserver,
    SupervisorState, resolve_install_dir,
};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::SupervisorConfig;
use super::env::build_environment;
use super::logs::FileLogSink;
use super::ports::{find_available, probe};
use super::shutdown::{exit_report, send_forceful, send_graceful};
use super::stream::spawn_stream_reader;

/// Commands executed by the monitor task that owns the `Child`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Terminate,
    Kill,
}

/// How the monitor task finished.
enum Outcome {
    Exited(io::Result<ExitStatus>),
    KillFailed(io::Error),
}

/// Live child reference. Exists only between spawn and exit confirmation.
struct ProcessHandle {
    run_id: u64,
    pid: Option<u32>,
    /// The port lease held by this child.
    port: u16,
    /// Environment overlay applied at spawn time.
    environment: BTreeMap<String, String>,
    control: mpsc::UnboundedSender<Control>,
    /// Reserved for bidirectional signaling with the child.
    stdin: Option<ChildStdin>,
    exited: watch::Receiver<bool>,
    kill_timer: CancellationToken,
    ready_timer: CancellationToken,
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("run_id", &self.run_id)
            .field("pid", &self.pid)
            .field("port", &self.port)
            .field("env_keys", &self.environment.keys().collect::<Vec<_>>())
            .field("stdin_open", &self.stdin.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: SupervisorState,
    preferred_port: Option<u16>,
    network: NetworkSettings,
    handle: Option<ProcessHandle>,
}

struct Shared {
    config: SupervisorConfig,
    observer: Arc<dyn SupervisorObserver>,
    sink: Arc<dyn LogSinkPort>,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<SupervisorState>,
    next_run: AtomicU64,
    /// Held by `start` for its whole body and by `terminate` while it
    /// inspects the handle.
    lifecycle: tokio::sync::Mutex<()>,
    restart_lock: tokio::sync::Mutex<()>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, inner: &mut Inner, state: SupervisorState) {
        if inner.state != state {
            debug!(from = %inner.state, to = %state, "Supervisor state change");
        }
        inner.state = state;
        self.state_tx.send_replace(state);
    }

    fn url_for(&self, port: u16) -> String {
        format!("{}://{}:{}", self.config.protocol, LOOPBACK_HOST, port)
    }

    /// First readiness marker of a run: `Starting -> Running`, fire `on_ready`.
    fn mark_ready(&self, run_id: u64) {
        let url = {
            let mut inner = self.lock();
            let port = match inner.handle.as_ref() {
                Some(h) if h.run_id == run_id => {
                    h.ready_timer.cancel();
                    h.port
                }
                _ => return,
            };
            if inner.state != SupervisorState::Starting {
                return;
            }
            self.set_state(&mut inner, SupervisorState::Running);
            self.url_for(port)
        };

        info!(url = %url, run_id, "Service is ready");
        self.observer.on_ready(&url);
    }

    /// Exit confirmed by the monitor: clear the handle and return to `Idle`.
    fn handle_exit(&self, run_id: u64, outcome: Outcome) {
        let (expected, port) = {
            let mut inner = self.lock();
            let Some(handle) = inner.handle.take_if(|h| h.run_id == run_id) else {
                debug!(run_id, "Ignoring exit of a stale run");
                return;
            };
            handle.kill_timer.cancel();
            handle.ready_timer.cancel();
            let expected = inner.state == SupervisorState::Stopping;
            self.set_state(&mut inner, SupervisorState::Idle);
            (expected, handle.port)
        };

        let message = match outcome {
            Outcome::Exited(Ok(status)) => {
                let report = exit_report(&status, expected);
                if expected {
                    info!(port = %port, status = %report, "Service stopped");
                } else {
                    warn!(port = %port, status = %report, "Service exited unexpectedly");
                }
                format!("Service process exited with {report}")
            }
            Outcome::Exited(Err(e)) => {
                warn!(port = %port, error = %e, "Failed to wait for service process");
                format!("Service process lost: {e}")
            }
            Outcome::KillFailed(e) => {
                error!(port = %port, error = %e, "Forceful kill failed, releasing handle");
                format!("Failed to kill service process: {e}")
            }
        };
        self.observer.on_log(&message);
    }

    /// Readiness deadline hit: report it if the run is still starting.
    fn readiness_expired(&self, run_id: u64, timeout: Duration) -> bool {
        let inner = self.lock();
        let still_starting = inner.state == SupervisorState::Starting
            && inner.handle.as_ref().is_some_and(|h| h.run_id == run_id);
        drop(inner);

        if still_starting {
            let err = SupervisorError::ReadinessTimeout(timeout);
            warn!(run_id, error = %err, label = err.as_label(), "Service readiness timed out");
            self.observer.on_error(&err.to_string());
        }
        still_starting
    }
}

/// Supervisor for exactly one instance of a child service.
///
/// Cheap to clone; all clones control the same child. Dropping the last
/// clone kills a still-running child.
///
/// # Example
///
/// ```ignore
/// let supervisor = ServiceSupervisor::new(config, Arc::new(callbacks))?;
/// supervisor.set_preferred_port(Some(5678));
/// supervisor.start().await?;
/// // ... on_ready fires with http://127.0.0.1:5678
/// supervisor.stop().await;
/// ```
#[derive(Clone)]
pub struct ServiceSupervisor {
    shared: Arc<Shared>,
}

impl ServiceSupervisor {
    /// Create a supervisor logging to a dated file in `config.log_dir`.
    ///
    /// Every captured line is forwarded to `observer.on_log`.
    pub fn new(
        config: SupervisorConfig,
        observer: Arc<dyn SupervisorObserver>,
    ) -> Result<Self, SupervisorError> {
        let sink = FileLogSink::open(&config.log_dir, &config.log_prefix)
            .map_err(|e| SupervisorError::LogSink(e.to_string()))?
            .with_forwarder(Arc::clone(&observer));
        Ok(Self::with_sink(config, observer, Arc::new(sink)))
    }

    /// Create a supervisor with a caller-provided sink.
    ///
    /// The sink is responsible for forwarding lines to the owner.
    pub fn with_sink(
        config: SupervisorConfig,
        observer: Arc<dyn SupervisorObserver>,
        sink: Arc<dyn LogSinkPort>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SupervisorState::Idle);
        Self {
            shared: Arc::new(Shared {
                config,
                observer,
                sink,
                inner: Mutex::new(Inner::default()),
                state_tx,
                next_run: AtomicU64::new(0),
                lifecycle: tokio::sync::Mutex::new(()),
                restart_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Use exactly this port on the next start (or scan when `None`).
    ///
    /// Never affects a running child.
    pub fn set_preferred_port(&self, port: Option<u16>) {
        self.shared.lock().preferred_port = port;
    }

    /// Network settings forwarded to the next child.
    ///
    /// Never affects a running child.
    pub fn set_network_settings(&self, settings: NetworkSettings) {
        self.shared.lock().network = settings;
    }

    pub fn state(&self) -> SupervisorState {
        self.shared.lock().state
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<SupervisorState> {
        self.shared.state_tx.subscribe()
    }

    /// True while a child process exists (starting, running or stopping).
    pub fn is_running(&self) -> bool {
        self.shared.lock().handle.is_some()
    }

    /// Port leased by the current child, if any.
    pub fn port(&self) -> Option<u16> {
        self.shared.lock().handle.as_ref().map(|h| h.port)
    }

    /// Service URL once the child reported readiness.
    pub fn url(&self) -> Option<String> {
        let inner = self.shared.lock();
        match (&inner.handle, inner.state) {
            (Some(h), SupervisorState::Running) => Some(self.shared.url_for(h.port)),
            _ => None,
        }
    }

    pub fn log_directory(&self) -> &Path {
        self.shared.sink.directory()
    }

    pub fn log_file(&self) -> &Path {
        self.shared.sink.file_path()
    }

    /// Launch the child service.
    ///
    /// Returns once the process is spawned; readiness is reported through
    /// `on_ready`. Failures are logged, reported via `on_error` and returned.
    pub async fn start(&self) -> Result<(), SupervisorError> {
        let _lifecycle = self.shared.lifecycle.lock().await;

        let (preferred_port, network) = {
            let mut inner = self.shared.lock();
            if inner.state != SupervisorState::Idle || inner.handle.is_some() {
                return Err(SupervisorError::AlreadyRunning);
            }
            self.shared.set_state(&mut inner, SupervisorState::Starting);
            (inner.preferred_port, inner.network.clone())
        };

        match self.spawn_child(preferred_port, &network) {
            Ok((child, port, environment)) => {
                let mut inner = self.shared.lock();
                let handle = self.attach(child, port, environment);
                info!(
                    port = %handle.port,
                    pid = ?handle.pid,
                    run_id = handle.run_id,
                    "Service spawned"
                );
                inner.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                {
                    let mut inner = self.shared.lock();
                    self.shared.set_state(&mut inner, SupervisorState::Idle);
                }
                error!(error = %e, label = e.as_label(), "Failed to start service");
                self.shared
                    .observer
                    .on_log(&format!("Error starting service: {e}"));
                self.shared.observer.on_error(&e.to_string());
                Err(e)
            }
        }
    }

    /// Stop the child: graceful signal, then a forceful kill after the grace period.
    ///
    /// No-op when idle. Resolves once the exit is confirmed. Concurrent callers
    /// join the same termination sequence.
    pub async fn stop(&self) {
        self.terminate(None).await;
    }

    /// `stop` followed by `start`, serialized against other restarts.
    pub async fn restart(&self) -> Result<(), SupervisorError> {
        let _guard = self.shared.restart_lock.lock().await;
        info!("Restarting service");
        self.shared.observer.on_log("Restarting service...");
        self.stop().await;
        self.start().await
    }

    /// Resolve the install dir, lease a port and spawn the process.
    ///
    /// Runs without the state lock, so owner callbacks may call back in.
    fn spawn_child(
        &self,
        preferred_port: Option<u16>,
        network: &NetworkSettings,
    ) -> Result<(Child, u16, BTreeMap<String, String>), SupervisorError> {
        let config = &self.shared.config;
        let observer = &self.shared.observer;

        let install_dir =
            resolve_install_dir(config.install_override.as_deref(), &config.packaged_install)?;
        observer.on_log(&format!("Using service from {}", install_dir.display()));

        let port = match preferred_port {
            Some(port) if probe(port) => port,
            Some(port) => return Err(SupervisorError::PortUnavailable(port)),
            None => find_available(config.base_port, config.max_port_attempts)?,
        };
        observer.on_log(&format!("Found available port: {port}"));

        let environment = build_environment(config, &install_dir, port, network);

        let mut cmd = Command::new(&config.command.program);
        cmd.args(&config.command.args)
            .current_dir(&install_dir)
            .envs(&environment)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        observer.on_log("Starting service...");
        let child = cmd
            .spawn()
            .map_err(|e| SupervisorError::SpawnFailure(e.to_string()))?;
        Ok((child, port, environment))
    }

    /// Wire readers, monitor and readiness timer to a freshly spawned child.
    ///
    /// Called with the state lock held so no task can observe the run before
    /// its handle is stored. Must not call into the observer.
    fn attach(
        &self,
        mut child: Child,
        port: u16,
        environment: BTreeMap<String, String>,
    ) -> ProcessHandle {
        let shared = &self.shared;
        let config = &shared.config;
        let run_id = shared.next_run.fetch_add(1, Ordering::SeqCst) + 1;
        let pid = child.id();
        let weak = Arc::downgrade(shared);

        if let Some(stdout) = child.stdout.take() {
            let weak = weak.clone();
            let marker = config.readiness_marker.clone();
            let mut announced = false;
            spawn_stream_reader(stdout, port, LogSource::Primary, move |line| {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                shared.sink.record(LogSource::Primary, &line);
                if !announced && line.contains(&marker) {
                    announced = true;
                    shared.mark_ready(run_id);
                }
            });
        }

        if let Some(stderr) = child.stderr.take() {
            let weak = weak.clone();
            let escalate = config.escalate_secondary_output;
            spawn_stream_reader(stderr, port, LogSource::Secondary, move |line| {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                shared.sink.record(LogSource::Secondary, &line);
                if escalate {
                    shared.observer.on_error(&line);
                }
            });
        }

        let stdin = child.stdin.take();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (exited_tx, exited_rx) = watch::channel(false);
        tokio::spawn(monitor(child, run_id, control_rx, exited_tx, weak));

        let ready_timer = CancellationToken::new();
        if let Some(timeout) = config.ready_timeout {
            let token = ready_timer.clone();
            let supervisor = Arc::downgrade(shared);
            tokio::spawn(async move {
                tokio::select! {
                    () = token.cancelled() => {}
                    () = tokio::time::sleep(timeout) => {
                        let Some(shared) = supervisor.upgrade() else {
                            return;
                        };
                        if shared.readiness_expired(run_id, timeout) {
                            Self { shared }.terminate(Some(run_id)).await;
                        }
                    }
                }
            });
        }

        ProcessHandle {
            run_id,
            pid,
            port,
            environment,
            control: control_tx,
            stdin,
            exited: exited_rx,
            kill_timer: CancellationToken::new(),
            ready_timer,
        }
    }

    /// Begin (or join) the termination of the current child.
    ///
    /// With `only_run`, does nothing unless that run is still current. Waits
    /// for an in-flight `start` so a child being spawned is not missed.
    async fn terminate(&self, only_run: Option<u64>) {
        let exited = {
            let _lifecycle = self.shared.lifecycle.lock().await;
            self.begin_termination(only_run)
        };

        if let Some(mut exited) = exited {
            // Sender dropped means the monitor is gone, which also means exited
            let _ = exited.wait_for(|done| *done).await;
        }
    }

    /// Mark `Stopping` and send the graceful signal unless already stopping.
    ///
    /// Returns the exit confirmation to wait on, `None` when idle.
    fn begin_termination(&self, only_run: Option<u64>) -> Option<watch::Receiver<bool>> {
        let mut inner = self.shared.lock();
        let handle = inner.handle.as_ref()?;
        if only_run.is_some_and(|run| run != handle.run_id) {
            return None;
        }

        let exited = handle.exited.clone();
        if inner.state != SupervisorState::Stopping {
            let control = handle.control.clone();
            let kill_timer = handle.kill_timer.clone();
            let port = handle.port;
            let pid = handle.pid;
            self.shared.set_state(&mut inner, SupervisorState::Stopping);
            drop(inner);

            info!(port = %port, pid = ?pid, "Stopping service");
            if control.send(Control::Terminate).is_err() {
                debug!("Monitor already finished, waiting for exit confirmation");
            }
            spawn_kill_timer(control, kill_timer, self.shared.config.stop_timeout);
        }
        Some(exited)
    }
}

/// Escalate to a forceful kill unless the exit arrives within `timeout`.
fn spawn_kill_timer(
    control: mpsc::UnboundedSender<Control>,
    token: CancellationToken,
    timeout: Duration,
) {
    tokio::spawn(async move {
        tokio::select! {
            () = token.cancelled() => {}
            () = tokio::time::sleep(timeout) => {
                warn!(timeout = ?timeout, "Service ignored graceful shutdown, killing");
                let _ = control.send(Control::Kill);
            }
        }
    });
}

/// Own the child until it exits, executing termination commands.
async fn monitor(
    mut child: Child,
    run_id: u64,
    mut control: mpsc::UnboundedReceiver<Control>,
    exited: watch::Sender<bool>,
    shared: Weak<Shared>,
) {
    let mut owner_gone = false;

    let outcome = loop {
        tokio::select! {
            status = child.wait() => break Outcome::Exited(status),
            cmd = control.recv(), if !owner_gone => match cmd {
                Some(Control::Terminate) => {
                    if let Err(e) = send_graceful(&mut child) {
                        warn!(run_id, error = %e, "Failed to send graceful termination signal");
                    }
                }
                Some(Control::Kill) => {
                    if let Err(e) = send_forceful(&mut child) {
                        break Outcome::KillFailed(e);
                    }
                }
                None => {
                    // Every supervisor handle was dropped
                    owner_gone = true;
                    debug!(run_id, "Supervisor dropped, killing service");
                    if let Err(e) = send_forceful(&mut child) {
                        warn!(run_id, error = %e, "Failed to kill orphaned service");
                    }
                }
            }
        }
    };

    if let Some(shared) = shared.upgrade() {
        shared.handle_exit(run_id, outcome);
    }
    let _ = exited.send(true);
}

impl fmt::Debug for ServiceSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.lock();
        f.debug_struct("ServiceSupervisor")
            .field("state", &inner.state)
            .field("preferred_port", &inner.preferred_port)
            .field("handle", &inner.handle)
            .finish_non_exhaustive()
    }
}
