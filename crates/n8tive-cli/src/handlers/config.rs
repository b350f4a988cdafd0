//! Config command handler.

use std::fmt::Write as _;

use anyhow::Result;
use n8tive_core::{AppConfig, CaCertConfig, DEFAULT_BASE_PORT, ProxyConfig};

use crate::bootstrap::CliContext;
use crate::config_commands::ConfigCommand;

/// Execute the config command.
pub fn execute(ctx: &CliContext, command: ConfigCommand) -> Result<()> {
    let store = &ctx.store;
    match command {
        ConfigCommand::Show => print!("{}", render(&store.try_load()?)),
        ConfigCommand::Path => println!("{}", store.path().display()),
        ConfigCommand::Reset => {
            store.reset()?;
            println!("✓ Settings reset to defaults.");
        }
        ConfigCommand::SetPort { port } => {
            store.set_port(port)?;
            println!("✓ n8n will run on port {port}.");
        }
        ConfigCommand::ClearPort => {
            store.clear_port()?;
            println!("✓ Port selection is automatic again (from {DEFAULT_BASE_PORT}).");
        }
        ConfigCommand::SetProxy { server, bypass } => {
            let mut proxy = ProxyConfig::new(server.trim());
            if let Some(bypass) = bypass {
                proxy = proxy.with_bypass(bypass);
            }
            store.set_proxy(proxy)?;
            println!("✓ Proxy saved. Restart n8n to apply.");
        }
        ConfigCommand::ClearProxy => {
            store.clear_proxy()?;
            println!("✓ Proxy removed. Restart n8n to apply.");
        }
        ConfigCommand::SetCaCert { path } => {
            if !path.is_file() {
                anyhow::bail!("CA certificate not found: {}", path.display());
            }
            store.set_ca_cert(CaCertConfig::new(path))?;
            println!("✓ CA certificate saved. Restart n8n to apply.");
        }
        ConfigCommand::ClearCaCert => {
            store.clear_ca_cert()?;
            println!("✓ CA certificate removed. Restart n8n to apply.");
        }
    }
    Ok(())
}

/// Human-readable summary of the saved settings.
pub fn render(config: &AppConfig) -> String {
    let mut out = String::new();
    let port = config.port.map_or_else(
        || format!("automatic (from {DEFAULT_BASE_PORT})"),
        |p| p.to_string(),
    );
    let _ = writeln!(out, "Port:           {port}");

    let proxy = match config.proxy.as_ref() {
        Some(p) => match p.active_server() {
            Some(server) => match p.bypass.as_deref() {
                Some(bypass) => format!("{server} (bypass: {bypass})"),
                None => server.to_string(),
            },
            None => "disabled".to_string(),
        },
        None => "not set".to_string(),
    };
    let _ = writeln!(out, "Proxy:          {proxy}");

    let ca = match config.ca_cert.as_ref() {
        Some(ca) => ca
            .active_path()
            .map_or_else(|| "disabled".to_string(), |p| p.display().to_string()),
        None => "not set".to_string(),
    };
    let _ = writeln!(out, "CA certificate: {ca}");
    out
}
