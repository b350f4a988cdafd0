//! Port command handler.

use anyhow::Result;
use n8tive_runtime::{find_available, probe};

use crate::config_commands::PortCommand;

/// Execute the port command.
pub fn execute(command: PortCommand) -> Result<()> {
    match command {
        PortCommand::Check { port } => {
            if probe(port) {
                println!("✓ Port {port} is available.");
            } else {
                println!("✗ Port {port} is in use.");
            }
        }
        PortCommand::Find { start, attempts } => {
            let port = find_available(start, attempts)?;
            println!("{port}");
        }
    }
    Ok(())
}
