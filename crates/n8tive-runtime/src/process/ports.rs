//! Port allocation utilities for the supervised service.
//!
//! Probes are real bind/release cycles on the loopback interface. A probe
//! reflects OS-level availability at the instant of the call; another
//! process may still claim the port before the child binds it.

use std::net::TcpListener;

use n8tive_core::{DEFAULT_BASE_PORT, DEFAULT_MAX_PORT_ATTEMPTS, LOOPBACK_HOST, SupervisorError};
use tracing::debug;

/// Check if a port is available by attempting to bind to it.
///
/// The listener is dropped before returning, which releases the port.
pub fn probe(port: u16) -> bool {
    match TcpListener::bind((LOOPBACK_HOST, port)) {
        Ok(listener) => listener.local_addr().is_ok(),
        Err(_) => false,
    }
}

/// Return the first free port in `start..start + max_attempts`.
///
/// Probes run sequentially in ascending order; each probe's socket is
/// released before the next one is bound. Candidates past `u16::MAX` are
/// not probed.
pub fn find_available(start: u16, max_attempts: u16) -> Result<u16, SupervisorError> {
    for offset in 0..max_attempts {
        let Some(port) = start.checked_add(offset) else {
            break;
        };

        if probe(port) {
            debug!(port = %port, "Allocated available port");
            return Ok(port);
        }
        debug!(port = %port, "Port unavailable on system, skipping");
    }

    let last = u32::from(start) + u32::from(max_attempts.max(1)) - 1;
    Err(SupervisorError::PortExhausted {
        start,
        end: u16::try_from(last).unwrap_or(u16::MAX),
    })
}

/// `find_available` with the default base port and attempt count.
pub fn find_available_default() -> Result<u16, SupervisorError> {
    find_available(DEFAULT_BASE_PORT, DEFAULT_MAX_PORT_ATTEMPTS)
}
