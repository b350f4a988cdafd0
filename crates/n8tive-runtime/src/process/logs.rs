//! File-backed log sink for the supervised service.
//!
//! One append-only UTF-8 file per calendar day (chosen when the sink is
//! opened, no mid-run rotation). Each record is also forwarded to the
//! owner and kept in a bounded in-memory buffer for quick tails.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Local;
use n8tive_core::{LogRecord, LogSinkPort, LogSource, SupervisorObserver, ensure_directory};
use tracing::warn;

/// Maximum number of records kept in memory.
const MAX_RECENT_RECORDS: usize = 1000;

/// Default file name prefix.
pub const DEFAULT_LOG_PREFIX: &str = "n8n";

struct SinkState {
    file: Option<File>,
    recent: VecDeque<LogRecord>,
}

/// Durable log sink writing `[timestamp] [source] text` lines.
pub struct FileLogSink {
    directory: PathBuf,
    file_path: PathBuf,
    forward: Option<Arc<dyn SupervisorObserver>>,
    state: Mutex<SinkState>,
}

impl FileLogSink {
    /// Open a sink in `directory`, creating the directory if necessary.
    ///
    /// The file name is `<prefix>-YYYY-MM-DD.log` for the current local date.
    pub fn open(directory: impl Into<PathBuf>, prefix: &str) -> std::io::Result<Self> {
        let directory = directory.into();
        ensure_directory(&directory).map_err(std::io::Error::other)?;

        let file_name = format!("{prefix}-{}.log", Local::now().format("%Y-%m-%d"));
        let file_path = directory.join(file_name);

        Ok(Self {
            directory,
            file_path,
            forward: None,
            state: Mutex::new(SinkState {
                file: None,
                recent: VecDeque::with_capacity(MAX_RECENT_RECORDS),
            }),
        })
    }

    /// Forward every recorded line to `observer.on_log`.
    #[must_use]
    pub fn with_forwarder(mut self, observer: Arc<dyn SupervisorObserver>) -> Self {
        self.forward = Some(observer);
        self
    }

    /// The most recent records, oldest first, at most `limit` of them.
    pub fn recent(&self, limit: usize) -> Vec<LogRecord> {
        let Ok(state) = self.state.lock() else {
            return Vec::new();
        };
        let skip = state.recent.len().saturating_sub(limit);
        state.recent.iter().skip(skip).cloned().collect()
    }

    fn append(file: &mut Option<File>, path: &Path, line: &str) -> std::io::Result<()> {
        if file.is_none() {
            *file = Some(OpenOptions::new().create(true).append(true).open(path)?);
        }
        if let Some(f) = file.as_mut() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

impl LogSinkPort for FileLogSink {
    fn record(&self, source: LogSource, text: &str) {
        let record = LogRecord::now(source, text);

        match self.state.lock() {
            Ok(mut state) => {
                let line = record.to_file_line();
                if let Err(e) = Self::append(&mut state.file, &self.file_path, &line) {
                    // Reopen on the next write
                    state.file = None;
                    warn!(
                        path = %self.file_path.display(),
                        error = %e,
                        "Failed to write service log"
                    );
                }
                if state.recent.len() >= MAX_RECENT_RECORDS {
                    state.recent.pop_front();
                }
                state.recent.push_back(record.clone());
            }
            Err(_) => warn!("Service log state poisoned, dropping line"),
        }

        if let Some(observer) = &self.forward {
            observer.on_log(&record.forwarded_text());
        }
    }

    fn directory(&self) -> &Path {
        &self.directory
    }

    fn file_path(&self) -> &Path {
        &self.file_path
    }
}

impl std::fmt::Debug for FileLogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLogSink")
            .field("file_path", &self.file_path)
            .field("forwarding", &self.forward.is_some())
            .finish_non_exhaustive()
    }
}
