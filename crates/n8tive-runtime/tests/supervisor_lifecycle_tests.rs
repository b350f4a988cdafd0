//! Lifecycle tests for `ServiceSupervisor` driving real `/bin/sh` children.
//!
//! Each test writes a small `service.sh` into a temp install directory.
//! The scripts print the readiness marker using the port handed to them
//! through `N8N_PORT`, so nothing actually binds the allocated port.

#![cfg(unix)]

use std::future::Future;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use n8tive_core::{
    CaCertConfig, NetworkSettings, ProxyConfig, SupervisorError, SupervisorObserver,
    SupervisorState,
};
use n8tive_runtime::{ServiceCommand, ServiceSupervisor, SupervisorConfig, probe};
use tempfile::TempDir;
use tokio::time::timeout;
use tokio_test::{assert_err, assert_ok};

const MARKER: &str = "Editor is now accessible via";
const WAIT: Duration = Duration::from_secs(10);
/// Shell line printing the readiness marker with the allocated port.
const ANNOUNCE: &str = "echo \"Editor is now accessible via http://localhost:$N8N_PORT\"";
/// Shell line keeping the child alive until it is terminated.
const IDLE: &str = "exec sleep 30";

#[derive(Default)]
struct Recorder {
    logs: Mutex<Vec<String>>,
    ready: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl Recorder {
    fn logs(&self) -> Vec<String> {
        self.logs.lock().unwrap().clone()
    }

    fn ready(&self) -> Vec<String> {
        self.ready.lock().unwrap().clone()
    }

    fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    fn has_log(&self, needle: &str) -> bool {
        self.logs().iter().any(|line| line.contains(needle))
    }
}

impl SupervisorObserver for Recorder {
    fn on_log(&self, line: &str) {
        self.logs.lock().unwrap().push(line.to_string());
    }

    fn on_ready(&self, url: &str) {
        self.ready.lock().unwrap().push(url.to_string());
    }

    fn on_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

struct Fixture {
    temp: TempDir,
    recorder: Arc<Recorder>,
}

impl Fixture {
    fn new(script: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let install = temp.path().join("dist");
        std::fs::create_dir_all(&install).unwrap();
        std::fs::write(install.join("service.sh"), script).unwrap();
        Self {
            temp,
            recorder: Arc::new(Recorder::default()),
        }
    }

    fn install_dir(&self) -> std::path::PathBuf {
        self.temp.path().join("dist")
    }

    fn config(&self) -> SupervisorConfig {
        SupervisorConfig::new(
            ServiceCommand::new("/bin/sh").arg("service.sh"),
            self.install_dir(),
            self.temp.path().join("data"),
            self.temp.path().join("logs"),
        )
        .with_readiness_marker(MARKER)
        .with_port_range(free_base_port(), 50)
        .with_stop_timeout(Duration::from_millis(500))
        .with_ready_timeout(None)
    }

    fn supervisor(&self, config: SupervisorConfig) -> ServiceSupervisor {
        ServiceSupervisor::new(config, self.recorder.clone()).unwrap()
    }
}

fn free_base_port() -> u16 {
    std::net::TcpListener::bind(("127.0.0.1", 0))
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
        .min(60_000)
}

/// One shell command per line.
fn script(lines: &[&str]) -> String {
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// Script that announces readiness and then idles until terminated.
fn ready_script() -> String {
    script(&[ANNOUNCE, IDLE])
}

fn loopback_port() -> u16 {
    std::net::TcpListener::bind(("127.0.0.1", 0))
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn exit_count(recorder: &Recorder) -> usize {
    recorder
        .logs()
        .iter()
        .filter(|line| line.starts_with("Service process exited"))
        .count()
}

async fn wait_for_state(supervisor: &ServiceSupervisor, state: SupervisorState) {
    let mut rx = supervisor.subscribe_state();
    timeout(WAIT, rx.wait_for(|s| *s == state))
        .await
        .expect("timed out waiting for state")
        .unwrap();
}

async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + WAIT;
    while !check().await {
        assert!(Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_start_reports_ready_url_once() {
    let again = format!("echo \"{MARKER} again\"");
    let fixture = Fixture::new(&script(&["echo booting", ANNOUNCE, &again, IDLE]));
    let supervisor = fixture.supervisor(fixture.config());

    assert_ok!(supervisor.start().await);
    assert!(supervisor.is_running());
    wait_for_state(&supervisor, SupervisorState::Running).await;

    let port = supervisor.port().unwrap();
    let expected = format!("http://127.0.0.1:{port}");
    assert_eq!(supervisor.url().as_deref(), Some(expected.as_str()));

    // Let the second marker line be consumed before counting
    let recorder = fixture.recorder.clone();
    eventually(|| {
        let recorder = recorder.clone();
        async move { recorder.has_log("again") }
    })
    .await;
    assert_eq!(fixture.recorder.ready(), vec![expected]);
    assert!(fixture.recorder.has_log("booting"));

    supervisor.stop().await;
    assert_eq!(supervisor.state(), SupervisorState::Idle);
    assert_eq!(supervisor.port(), None);
    assert_eq!(supervisor.url(), None);
}

#[tokio::test]
async fn test_second_start_is_rejected_without_side_effects() {
    let fixture = Fixture::new(&ready_script());
    let supervisor = fixture.supervisor(fixture.config());

    assert_ok!(supervisor.start().await);
    wait_for_state(&supervisor, SupervisorState::Running).await;
    let port = supervisor.port();

    let err = assert_err!(supervisor.start().await);
    assert_eq!(err, SupervisorError::AlreadyRunning);
    assert_eq!(supervisor.state(), SupervisorState::Running);
    assert_eq!(supervisor.port(), port);
    assert!(fixture.recorder.errors().is_empty());

    supervisor.stop().await;
}

#[tokio::test]
async fn test_preferred_port_in_use_does_not_fall_back() {
    let fixture = Fixture::new(&ready_script());
    let supervisor = fixture.supervisor(fixture.config());

    let held = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let port = held.local_addr().unwrap().port();
    supervisor.set_preferred_port(Some(port));

    let err = assert_err!(supervisor.start().await);
    assert_eq!(err, SupervisorError::PortUnavailable(port));
    assert_eq!(supervisor.state(), SupervisorState::Idle);
    assert!(!supervisor.is_running());
    assert_eq!(fixture.recorder.errors().len(), 1);
    assert!(fixture.recorder.errors()[0].contains(&port.to_string()));
}

#[tokio::test]
async fn test_preferred_port_is_used_exactly() {
    let fixture = Fixture::new(&ready_script());
    let supervisor = fixture.supervisor(fixture.config());

    let port = loopback_port();
    assert!(probe(port));
    supervisor.set_preferred_port(Some(port));

    assert_ok!(supervisor.start().await);
    assert_eq!(supervisor.port(), Some(port));
    wait_for_state(&supervisor, SupervisorState::Running).await;
    assert_eq!(
        fixture.recorder.ready(),
        vec![format!("http://127.0.0.1:{port}")]
    );

    supervisor.stop().await;
}

#[tokio::test]
async fn test_missing_install_override_is_reported() {
    let fixture = Fixture::new(&ready_script());
    let missing = fixture.temp.path().join("nowhere");
    let config = fixture
        .config()
        .with_install_override(Some(missing.clone()));
    let supervisor = fixture.supervisor(config);

    let err = assert_err!(supervisor.start().await);
    assert_eq!(err, SupervisorError::InstallationNotFound { path: missing });
    assert_eq!(supervisor.state(), SupervisorState::Idle);
    assert_eq!(fixture.recorder.errors().len(), 1);
}

#[tokio::test]
async fn test_spawn_failure_returns_to_idle() {
    let fixture = Fixture::new(&ready_script());
    let mut config = fixture.config();
    config.command = ServiceCommand::new("/nonexistent/n8tive-service");
    let supervisor = fixture.supervisor(config);

    let err = assert_err!(supervisor.start().await);
    assert!(matches!(err, SupervisorError::SpawnFailure(_)));
    assert_eq!(supervisor.state(), SupervisorState::Idle);
    assert_eq!(fixture.recorder.errors().len(), 1);
}

#[tokio::test]
async fn test_stop_when_idle_is_a_noop() {
    let fixture = Fixture::new(&ready_script());
    let supervisor = fixture.supervisor(fixture.config());

    let started = Instant::now();
    supervisor.stop().await;
    assert!(started.elapsed() < Duration::from_millis(200));
    assert_eq!(supervisor.state(), SupervisorState::Idle);
    assert!(fixture.recorder.logs().is_empty());
    assert!(fixture.recorder.errors().is_empty());
}

#[tokio::test]
async fn test_stop_kills_child_ignoring_terminate() {
    let fixture = Fixture::new(&format!(
        "trap '' TERM\necho \"{MARKER} http://localhost:$N8N_PORT\"\nwhile :; do sleep 1; done\n"
    ));
    let supervisor = fixture.supervisor(fixture.config());

    assert_ok!(supervisor.start().await);
    wait_for_state(&supervisor, SupervisorState::Running).await;

    let started = Instant::now();
    timeout(WAIT, supervisor.stop()).await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(500), "stopped after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(4), "stopped after {elapsed:?}");
    assert_eq!(supervisor.state(), SupervisorState::Idle);
    assert!(fixture.recorder.has_log("signal 9"));
}

#[tokio::test]
async fn test_graceful_stop_does_not_wait_for_kill_timer() {
    let fixture = Fixture::new(&ready_script());
    let config = fixture.config().with_stop_timeout(Duration::from_secs(5));
    let supervisor = fixture.supervisor(config);

    assert_ok!(supervisor.start().await);
    wait_for_state(&supervisor, SupervisorState::Running).await;

    let started = Instant::now();
    supervisor.stop().await;
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(supervisor.state(), SupervisorState::Idle);
}

#[tokio::test]
async fn test_concurrent_stops_join_one_sequence() {
    let fixture = Fixture::new(&ready_script());
    let supervisor = fixture.supervisor(fixture.config());

    assert_ok!(supervisor.start().await);
    wait_for_state(&supervisor, SupervisorState::Running).await;

    let other = supervisor.clone();
    timeout(WAIT, async { tokio::join!(supervisor.stop(), other.stop()) })
        .await
        .unwrap();

    assert_eq!(supervisor.state(), SupervisorState::Idle);
    assert_eq!(exit_count(&fixture.recorder), 1);
}

#[tokio::test]
async fn test_restart_produces_one_new_ready_event() {
    let fixture = Fixture::new(&ready_script());
    let supervisor = fixture.supervisor(fixture.config());

    assert_ok!(supervisor.start().await);
    wait_for_state(&supervisor, SupervisorState::Running).await;
    assert_eq!(fixture.recorder.ready().len(), 1);

    assert_ok!(supervisor.restart().await);
    wait_for_state(&supervisor, SupervisorState::Running).await;

    assert_eq!(fixture.recorder.ready().len(), 2);
    assert!(fixture.recorder.has_log("Restarting service..."));
    assert!(supervisor.is_running());

    supervisor.stop().await;
}

#[tokio::test]
async fn test_restart_from_idle_starts_service() {
    let fixture = Fixture::new(&ready_script());
    let supervisor = fixture.supervisor(fixture.config());

    assert_ok!(supervisor.restart().await);
    wait_for_state(&supervisor, SupervisorState::Running).await;
    assert_eq!(fixture.recorder.ready().len(), 1);

    supervisor.stop().await;
}

#[tokio::test]
async fn test_restart_reconfirms_preferred_port() {
    let fixture = Fixture::new(&ready_script());
    let supervisor = fixture.supervisor(fixture.config());
    let first = loopback_port();
    supervisor.set_preferred_port(Some(first));

    assert_ok!(supervisor.start().await);
    wait_for_state(&supervisor, SupervisorState::Running).await;
    assert_eq!(supervisor.port(), Some(first));

    let second = loop {
        let candidate = loopback_port();
        if candidate != first {
            break candidate;
        }
    };
    supervisor.set_preferred_port(Some(second));
    assert_eq!(supervisor.port(), Some(first));

    assert_ok!(supervisor.restart().await);
    wait_for_state(&supervisor, SupervisorState::Running).await;

    assert_eq!(supervisor.port(), Some(second));
    assert_eq!(
        fixture.recorder.ready(),
        vec![
            format!("http://127.0.0.1:{first}"),
            format!("http://127.0.0.1:{second}"),
        ]
    );

    supervisor.stop().await;
}

#[tokio::test]
async fn test_stop_while_starting_never_reports_ready() {
    let late = format!("trap 'echo \"{MARKER} late\"; exit 0' TERM");
    let fixture = Fixture::new(&script(&[
        &late,
        "echo booting",
        "while :; do sleep 0.1; done",
    ]));
    let supervisor = fixture.supervisor(fixture.config());

    assert_ok!(supervisor.start().await);
    let recorder = fixture.recorder.clone();
    eventually(|| {
        let recorder = recorder.clone();
        async move { recorder.has_log("booting") }
    })
    .await;
    assert_eq!(supervisor.state(), SupervisorState::Starting);

    timeout(WAIT, supervisor.stop()).await.unwrap();
    assert_eq!(supervisor.state(), SupervisorState::Idle);

    // The marker printed on the way out must not promote a finished run
    let recorder = fixture.recorder.clone();
    eventually(|| {
        let recorder = recorder.clone();
        async move { recorder.has_log("late") }
    })
    .await;
    assert!(fixture.recorder.ready().is_empty());
    assert_eq!(supervisor.state(), SupervisorState::Idle);
    assert_eq!(supervisor.url(), None);
}

#[tokio::test]
async fn test_restart_and_stop_join_one_termination() {
    let fixture = Fixture::new(&ready_script());
    let supervisor = fixture.supervisor(fixture.config());
    let other = supervisor.clone();

    assert_ok!(supervisor.start().await);
    wait_for_state(&supervisor, SupervisorState::Running).await;

    let (restarted, ()) = timeout(WAIT, async {
        tokio::join!(supervisor.restart(), other.stop())
    })
    .await
    .unwrap();
    assert_ok!(restarted);

    wait_for_state(&supervisor, SupervisorState::Running).await;
    assert_eq!(exit_count(&fixture.recorder), 1);
    assert_eq!(fixture.recorder.ready().len(), 2);

    supervisor.stop().await;
    assert_eq!(exit_count(&fixture.recorder), 2);
}

/// Observer that calls back into the supervisor from every log line.
#[derive(Default)]
struct QueryingObserver {
    supervisor: OnceLock<ServiceSupervisor>,
    seen: Mutex<Vec<(String, bool)>>,
}

impl SupervisorObserver for QueryingObserver {
    fn on_log(&self, line: &str) {
        if let Some(supervisor) = self.supervisor.get() {
            let running = supervisor.is_running();
            let _ = (supervisor.state(), supervisor.port(), supervisor.url());
            self.seen.lock().unwrap().push((line.to_string(), running));
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_callbacks_may_query_supervisor_during_start() {
    let fixture = Fixture::new(&ready_script());
    let observer = Arc::new(QueryingObserver::default());
    let supervisor = ServiceSupervisor::new(fixture.config(), observer.clone()).unwrap();
    assert!(observer.supervisor.set(supervisor.clone()).is_ok());

    let starter = supervisor.clone();
    let started = timeout(WAIT, tokio::spawn(async move { starter.start().await }))
        .await
        .expect("start blocked on a re-entrant callback")
        .unwrap();
    assert_ok!(started);
    wait_for_state(&supervisor, SupervisorState::Running).await;

    let observer_seen = observer.clone();
    eventually(|| {
        let observer = observer_seen.clone();
        async move {
            let seen = observer.seen.lock().unwrap();
            seen.iter().any(|(line, running)| line.contains(MARKER) && *running)
        }
    })
    .await;
    let seen = observer.seen.lock().unwrap().clone();
    assert!(
        seen.iter()
            .any(|(line, running)| line.starts_with("Found available port") && !running)
    );

    timeout(WAIT, supervisor.stop()).await.unwrap();
    assert_eq!(supervisor.state(), SupervisorState::Idle);
}

#[tokio::test]
async fn test_unexpected_exit_returns_to_idle() {
    let fixture = Fixture::new("echo starting\nexit 3\n");
    let supervisor = fixture.supervisor(fixture.config());

    assert_ok!(supervisor.start().await);
    wait_for_state(&supervisor, SupervisorState::Idle).await;

    assert!(!supervisor.is_running());
    assert_eq!(supervisor.port(), None);
    let recorder = fixture.recorder.clone();
    eventually(|| {
        let recorder = recorder.clone();
        async move { recorder.has_log("exit code 3") }
    })
    .await;

    // A fresh start is possible after the crash
    assert_ok!(supervisor.start().await);
    wait_for_state(&supervisor, SupervisorState::Idle).await;
}

#[tokio::test]
async fn test_readiness_timeout_reports_and_stops() {
    let fixture = Fixture::new("echo still booting\nexec sleep 30\n");
    let config = fixture
        .config()
        .with_ready_timeout(Some(Duration::from_millis(300)));
    let supervisor = fixture.supervisor(config);

    assert_ok!(supervisor.start().await);
    let recorder = fixture.recorder.clone();
    eventually(|| {
        let recorder = recorder.clone();
        async move { !recorder.errors().is_empty() }
    })
    .await;
    wait_for_state(&supervisor, SupervisorState::Idle).await;

    assert!(fixture.recorder.ready().is_empty());
    assert!(fixture.recorder.errors()[0].contains("readiness"));
}

#[tokio::test]
async fn test_stderr_is_logged_but_not_escalated() {
    let fixture = Fixture::new(&script(&[
        "echo \"deprecation warning\" >&2",
        ANNOUNCE,
        IDLE,
    ]));
    let supervisor = fixture.supervisor(fixture.config());

    assert_ok!(supervisor.start().await);
    wait_for_state(&supervisor, SupervisorState::Running).await;
    let recorder = fixture.recorder.clone();
    eventually(|| {
        let recorder = recorder.clone();
        async move { recorder.has_log("[stderr] deprecation warning") }
    })
    .await;

    assert!(fixture.recorder.errors().is_empty());
    assert_eq!(supervisor.state(), SupervisorState::Running);
    supervisor.stop().await;
}

#[tokio::test]
async fn test_stderr_escalation_reports_errors() {
    let fixture = Fixture::new("echo \"database locked\" >&2\nexec sleep 30\n");
    let config = fixture.config().with_secondary_escalation(true);
    let supervisor = fixture.supervisor(config);

    assert_ok!(supervisor.start().await);
    let recorder = fixture.recorder.clone();
    eventually(|| {
        let recorder = recorder.clone();
        async move { !recorder.errors().is_empty() }
    })
    .await;

    assert_eq!(fixture.recorder.errors(), vec!["database locked".to_string()]);
    supervisor.stop().await;
}

#[tokio::test]
async fn test_child_receives_environment_overlay() {
    let fixture = Fixture::new(&script(&[
        "echo \"port=$N8N_PORT host=$N8N_HOST proxy=$HTTPS_PROXY\" \\",
        "  \"ca=$NODE_EXTRA_CA_CERTS folder=$N8N_USER_FOLDER\"",
        ANNOUNCE,
        IDLE,
    ]));
    let supervisor = fixture.supervisor(fixture.config());
    supervisor.set_network_settings(NetworkSettings {
        proxy: Some(ProxyConfig::new("http://proxy.local:3128")),
        ca_cert: Some(CaCertConfig::new("/etc/ssl/corp.pem")),
    });

    assert_ok!(supervisor.start().await);
    wait_for_state(&supervisor, SupervisorState::Running).await;
    let port = supervisor.port().unwrap();

    let data_dir = fixture.temp.path().join("data");
    let expected = format!(
        "port={port} host=127.0.0.1 proxy=http://proxy.local:3128 ca=/etc/ssl/corp.pem folder={}",
        data_dir.display()
    );
    assert!(fixture.recorder.has_log(&expected), "{:?}", fixture.recorder.logs());

    supervisor.stop().await;
}

#[tokio::test]
async fn test_output_is_written_to_dated_log_file() {
    let fixture = Fixture::new(&script(&[
        "echo \"hello from child\"",
        "echo \"warn from child\" >&2",
        ANNOUNCE,
        IDLE,
    ]));
    let supervisor = fixture.supervisor(fixture.config());

    assert_ok!(supervisor.start().await);
    wait_for_state(&supervisor, SupervisorState::Running).await;
    let recorder = fixture.recorder.clone();
    eventually(|| {
        let recorder = recorder.clone();
        async move { recorder.has_log("warn from child") }
    })
    .await;
    supervisor.stop().await;

    assert_eq!(supervisor.log_directory(), fixture.temp.path().join("logs"));
    let contents = std::fs::read_to_string(supervisor.log_file()).unwrap();
    assert!(contents.contains("[stdout] hello from child"));
    assert!(contents.contains("[stderr] warn from child"));
    let name = supervisor.log_file().file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("n8n-") && name.ends_with(".log"));
}
