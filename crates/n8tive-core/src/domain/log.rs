//! Log records captured from the child's output streams.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Which of the child's output streams a line came from.
///
/// Ordering is preserved within a source; nothing is guaranteed between
/// the two sources since they are read independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    /// Standard output.
    Primary,
    /// Standard error, treated as diagnostic output.
    Secondary,
}

impl LogSource {
    /// Tag written into the log file for this source.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Primary => "stdout",
            Self::Secondary => "stderr",
        }
    }
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A single captured line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub source: LogSource,
    pub text: String,
}

impl LogRecord {
    /// Create a record stamped with the current time.
    pub fn now(source: LogSource, text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            source,
            text: text.into(),
        }
    }

    /// Format as a log file line: `[timestamp] [tag] text` (no trailing newline).
    pub fn to_file_line(&self) -> String {
        format!(
            "[{}] [{}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.source,
            self.text
        )
    }

    /// Text handed to the owner's log callback.
    ///
    /// Secondary lines carry their tag as a prefix so the owner can tell them apart.
    pub fn forwarded_text(&self) -> String {
        match self.source {
            LogSource::Primary => self.text.clone(),
            LogSource::Secondary => format!("[{}] {}", self.source, self.text),
        }
    }
}
