//! Domain vocabulary shared by the supervisor and its owners.

mod log;
mod state;

pub use log::{LogRecord, LogSource};
pub use state::{ExitReport, SupervisorState};
