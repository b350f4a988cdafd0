//! CLI entry point - the composition root.

use std::path::Path;

use clap::{CommandFactory, Parser};
use tracing_appender::non_blocking::WorkerGuard;

use n8tive_cli::{Cli, CliConfig, Commands, bootstrap, handlers};

/// Initialize tracing with a console layer and a daily rolling file.
///
/// Logs are written to:
/// - stdout (compact)
/// - {logs_dir}/n8tive.{date} (daily rotation via tracing-appender)
///
/// Log level is controlled by `RUST_LOG` (default: info, debug with `-v`).
fn init_tracing(logs_dir: &Path, verbose: bool) -> WorkerGuard {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let file_appender = tracing_appender::rolling::daily(logs_dir, "n8tive");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let level = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = ["n8tive_core", "n8tive_runtime", "n8tive_cli"]
            .map(|target| format!("{target}={level}"))
            .join(",");
        tracing_subscriber::EnvFilter::new(format!("warn,{directives}"))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact(),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .compact(),
        )
        .try_init()
        .ok();

    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let ctx = bootstrap(CliConfig::with_defaults().with_data_dir(cli.data_dir.clone()))?;
    let _guard = init_tracing(&ctx.logs_dir, cli.verbose);

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Run(args) => handlers::run::execute(&ctx, args).await?,
        Commands::Config { command } => handlers::config::execute(&ctx, command)?,
        Commands::Logs { lines } => handlers::logs::execute(&ctx, lines)?,
        Commands::Port { command } => handlers::port::execute(command)?,
    }

    Ok(())
}
