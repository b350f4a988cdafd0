//! Log sink port for durable capture of child output.
//!
//! This port abstracts the destination for the child's stdout/stderr lines,
//! allowing a file-backed implementation in production and in-memory
//! implementations in tests.

use std::path::Path;

use crate::domain::LogSource;

/// Port for recording lines from the supervised child.
///
/// Implementations must be thread-safe: both output streams record
/// concurrently. Recording is best-effort; failures are reported to
/// diagnostics and never surfaced to the caller.
pub trait LogSinkPort: Send + Sync {
    /// Record one line (without trailing newline) from `source`.
    ///
    /// Implementations are also responsible for forwarding the line to
    /// the owner's log callback, if they have one.
    fn record(&self, source: LogSource, text: &str);

    /// Directory holding the log files.
    fn directory(&self) -> &Path;

    /// File currently being appended to.
    fn file_path(&self) -> &Path;
}
