//! Logs command handler.

use anyhow::Result;
use n8tive_core::LogSinkPort;
use n8tive_runtime::{DEFAULT_LOG_PREFIX, FileLogSink};

use crate::bootstrap::CliContext;

/// Print the log locations and the last `lines` lines of today's file.
pub fn execute(ctx: &CliContext, lines: usize) -> Result<()> {
    let sink = FileLogSink::open(&ctx.logs_dir, DEFAULT_LOG_PREFIX)?;
    let file = sink.file_path();

    println!("Log directory: {}", ctx.logs_dir.display());
    println!("Today's log:   {}", file.display());

    match std::fs::read_to_string(file) {
        Ok(contents) => {
            println!();
            for line in tail(&contents, lines) {
                println!("{line}");
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("(n8n has not written any output today)");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// The last `n` lines of `contents`.
pub fn tail(contents: &str, n: usize) -> Vec<&str> {
    let lines: Vec<&str> = contents.lines().collect();
    let skip = lines.len().saturating_sub(n);
    lines[skip..].to_vec()
}
