//! Termination signals for `tokio::process::Child` and exit reporting.
//!
//! The escalation policy (grace period, then forceful kill) lives in the
//! supervisor; this module only knows how to deliver each signal.

use std::io;
use std::process::ExitStatus;

use n8tive_core::ExitReport;
use tokio::process::Child;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Ask the child to shut down.
///
/// - Unix: SIGTERM via the nix crate
/// - Windows: no graceful equivalent, terminates immediately
///
/// A child that has already exited is not an error.
pub fn send_graceful(child: &mut Child) -> io::Result<()> {
    #[cfg(unix)]
    {
        let Some(pid) = child.id() else {
            // Already reaped
            return Ok(());
        };
        let pid = i32::try_from(pid).map_err(io::Error::other)?;
        match signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
            Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
            Err(e) => Err(io::Error::other(e)),
        }
    }

    #[cfg(not(unix))]
    {
        send_forceful(child)
    }
}

/// Kill the child unconditionally (SIGKILL on Unix, `TerminateProcess` on Windows).
pub fn send_forceful(child: &mut Child) -> io::Result<()> {
    match child.start_kill() {
        Ok(()) => Ok(()),
        // Already exited and reaped
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
        Err(e) => Err(e),
    }
}

/// Describe how a child ended.
pub fn exit_report(status: &ExitStatus, expected: bool) -> ExitReport {
    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    };
    #[cfg(not(unix))]
    let signal = None;

    ExitReport {
        code: status.code(),
        signal,
        expected,
    }
}
