//! Owner-facing notification contract.
//!
//! The owner of a supervisor (tray shell, CLI, IPC bridge) learns about
//! the child only through these callbacks:
//!
//! - `on_log` - zero or more times, one call per line or status message
//! - `on_ready` - at most once per successful start, with the service URL
//! - `on_error` - zero or more times (start failures, readiness timeout,
//!   escalated diagnostics)
//!
//! Callbacks may fire from background tasks and concurrently with each other.

use std::fmt;
use std::sync::Arc;

/// Observer for supervisor notifications. All methods default to no-ops.
pub trait SupervisorObserver: Send + Sync {
    fn on_log(&self, _line: &str) {}

    fn on_ready(&self, _url: &str) {}

    fn on_error(&self, _message: &str) {}
}

/// Observer that discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SupervisorObserver for NoopObserver {}

type Callback = Arc<dyn Fn(&str) + Send + Sync>;

/// Closure-backed observer built from three independent callbacks.
///
/// # Example
///
/// ```
/// use n8tive_core::ports::{Callbacks, SupervisorObserver};
///
/// let callbacks = Callbacks::new()
///     .on_ready(|url| println!("ready at {url}"))
///     .on_error(|err| eprintln!("error: {err}"));
/// SupervisorObserver::on_log(&callbacks, "ignored");
/// ```
#[derive(Clone, Default)]
pub struct Callbacks {
    log: Option<Callback>,
    ready: Option<Callback>,
    error: Option<Callback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_log(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.log = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_ready(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.ready = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.error = Some(Arc::new(f));
        self
    }
}

impl SupervisorObserver for Callbacks {
    fn on_log(&self, line: &str) {
        if let Some(f) = &self.log {
            f(line);
        }
    }

    fn on_ready(&self, url: &str) {
        if let Some(f) = &self.ready {
            f(url);
        }
    }

    fn on_error(&self, message: &str) {
        if let Some(f) = &self.error {
            f(message);
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("log", &self.log.is_some())
            .field("ready", &self.ready.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}
