use std::path::PathBuf;

use clap::Parser;
use colored::*;

use crate::commands::StoreCommand;
use crate::config::{BridgeConfig, ReconnectConfig};
use crate::error::BridgeError;
use crate::sink::StoreSink;

#[derive(Parser, Debug)]
#[command(name = "realtime-bridge")]
#[command(version)]
#[command(about = "Follow a push-notification endpoint and print the store commands it produces")]
pub struct Args {
    /// TOML config file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Push server origin, e.g. ws://127.0.0.1:6767 (overrides the config file)
    #[arg(long)]
    pub url: Option<String>,

    /// Base path the push endpoint is mounted under, e.g. /api/ (overrides the config file)
    #[arg(long)]
    pub base_path: Option<String>,

    /// Do not reconnect after the connection drops; exit once the session ends
    #[arg(long)]
    pub no_reconnect: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log: String,
}

/// Merge the config file (if any) with command-line overrides and validate.
pub fn resolve_config(args: &Args) -> Result<BridgeConfig, BridgeError> {
    let mut config = match &args.config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };
    if let Some(url) = &args.url {
        config.server_url = url.clone();
    }
    if let Some(base_path) = &args.base_path {
        config.base_path = base_path.clone();
    }
    if args.no_reconnect {
        config.reconnect = ReconnectConfig { enabled: false, ..config.reconnect };
    }
    config.validate()?;
    Ok(config)
}

/// Store sink that prints each command as a JSON line on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintStore;

/// One printed line for `command`.
pub fn render_command(command: &StoreCommand) -> String {
    let json = serde_json::to_string(command).unwrap_or_else(|_| command.to_string());
    format!("{} {}", "dispatch".bright_green(), json)
}

impl StoreSink for PrintStore {
    fn dispatch(&self, command: StoreCommand) {
        println!("{}", render_command(&command));
    }
}
