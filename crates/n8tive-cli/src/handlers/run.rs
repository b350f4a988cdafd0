//! `n8tive run`: start n8n and supervise it until a shutdown signal.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use n8tive_core::{Callbacks, LogRecord, SupervisorObserver, SupervisorState};
use n8tive_runtime::{FileLogSink, ServiceSupervisor, SupervisorConfig};
use tracing::{info, warn};

use crate::bootstrap::CliContext;
use crate::commands::RunArgs;
use crate::signals::wait_for_shutdown_signal;

/// Directory name of the n8n distribution shipped next to the binary.
const PACKAGED_DIST_DIR: &str = "n8n-dist";

/// Child output lines replayed when n8n exits on its own.
const CRASH_TAIL_LINES: usize = 20;

/// Location of the n8n distribution bundled alongside the executable.
fn packaged_install_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Cannot locate the n8tive executable")?;
    let dir = exe
        .parent()
        .map_or_else(|| PathBuf::from("."), std::path::Path::to_path_buf);
    Ok(dir.join(PACKAGED_DIST_DIR))
}

/// Build the supervisor configuration from saved settings and flags.
pub fn supervisor_config(ctx: &CliContext, args: &RunArgs) -> Result<SupervisorConfig> {
    let mut config = SupervisorConfig::n8n(packaged_install_dir()?, &ctx.data_root, &ctx.logs_dir)
        .with_install_override(args.install_dir.clone());

    if let Some(marker) = &args.marker {
        config = config.with_readiness_marker(marker.clone());
    }
    if let Some(secs) = args.ready_timeout {
        config = config.with_ready_timeout((secs > 0).then(|| Duration::from_secs(secs)));
    }
    Ok(config)
}

/// Last captured child lines, oldest first, as the owner saw them.
fn crash_tail(sink: &FileLogSink) -> Vec<String> {
    sink.recent(CRASH_TAIL_LINES)
        .iter()
        .map(LogRecord::forwarded_text)
        .collect()
}

/// Execute the run command.
///
/// Blocks until Ctrl-C/SIGTERM (then stops n8n gracefully) or until n8n
/// exits on its own (reported as an error).
pub async fn execute(ctx: &CliContext, args: RunArgs) -> Result<()> {
    let saved = ctx.store.load();
    let config = supervisor_config(ctx, &args)?;

    let observer: Arc<dyn SupervisorObserver> = Arc::new(
        Callbacks::new()
            .on_log(|line| println!("{line}"))
            .on_ready(|url| println!("✓ n8n is ready at {url}"))
            .on_error(|message| eprintln!("✗ {message}")),
    );
    let sink = Arc::new(
        FileLogSink::open(&config.log_dir, &config.log_prefix)
            .with_context(|| format!("Cannot open log directory {}", config.log_dir.display()))?
            .with_forwarder(Arc::clone(&observer)),
    );
    let supervisor = ServiceSupervisor::with_sink(config, observer, sink.clone());

    let network = saved.network_settings();
    if !network.is_empty() {
        info!(
            proxy = network.proxy.is_some(),
            ca_cert = network.ca_cert.is_some(),
            "Forwarding network settings to n8n"
        );
    }
    supervisor.set_preferred_port(args.port.or(saved.port));
    supervisor.set_network_settings(network);

    supervisor.start().await?;
    println!("Service log: {}", supervisor.log_file().display());

    let mut state = supervisor.subscribe_state();
    let exited_on_its_own = tokio::select! {
        res = wait_for_shutdown_signal() => {
            res.context("Failed to listen for shutdown signals")?;
            false
        }
        _ = state.wait_for(|s| *s == SupervisorState::Idle) => true,
    };

    if exited_on_its_own {
        warn!("n8n exited without being asked to stop");
        let tail = crash_tail(&sink);
        if !tail.is_empty() {
            eprintln!("Last output from n8n:");
            for line in &tail {
                eprintln!("  {line}");
            }
        }
        bail!("n8n exited unexpectedly, see {}", supervisor.log_file().display());
    }

    info!("Shutdown signal received, stopping n8n");
    println!("Stopping n8n...");
    supervisor.stop().await;
    println!("✓ n8n stopped.");
    Ok(())
}
