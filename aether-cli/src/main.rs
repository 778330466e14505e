//! `aether` command-line host.
//!
//! Loads configuration, installs the log subscriber, and dispatches to the
//! `run` or `tool` command.

mod cli;
mod commands;

use std::process::ExitCode;
use std::sync::Arc;

use aether_config::RuntimeConfig;
use aether_telemetry::{Telemetry, install_subscriber};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let telemetry = Arc::new(Telemetry::new("aethercore", env!("CARGO_PKG_VERSION")));
    let cli = Cli::parse();

    let code = match run(cli, Arc::clone(&telemetry)).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "command failed");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    };

    info!(boot_latency = %telemetry.format_boot_latency(), "system shutdown");
    code
}

async fn run(cli: Cli, telemetry: Arc<Telemetry>) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    install_subscriber(&config.log.subscriber()).context("failed to install log subscriber")?;
    debug!(?config, "boot sequence started");

    commands::dispatch(cli.command, config, telemetry).await
}

/// Defaults, then the config file, then `AETHER_*` variables, then flags.
fn load_config(cli: &Cli) -> Result<RuntimeConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => aether_config::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    config.apply_env()?;

    if let Some(level) = cli.log_level.as_deref() {
        level.clone_into(&mut config.log.level);
    }
    if let Some(format) = cli.log_format {
        config.log.format = format;
    }

    config.validate()?;
    Ok(config)
}
