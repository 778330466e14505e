//! Command implementations.

mod run;
mod tool;

use std::process::ExitCode;
use std::sync::Arc;

use aether_adapters::GenerationBackend;
use aether_adapters::mock::KeywordToolBackend;
use aether_adapters::ollama::{OllamaBackend, OllamaConfig};
use aether_config::{BackendProvider, BackendSettings, RuntimeConfig};
use aether_telemetry::Telemetry;
use aether_tools::{ToolRegistry, builtin};
use anyhow::{Context, Result};

use crate::cli::{Command, RunArgs, ToolCommand};

/// Exit code for a run interrupted by SIGINT or SIGTERM.
pub const EXIT_INTERRUPTED: u8 = 130;

/// Routes a parsed command to its handler.
pub async fn dispatch(
    command: Command,
    config: RuntimeConfig,
    telemetry: Arc<Telemetry>,
) -> Result<ExitCode> {
    match command {
        Command::Run(args) => run_command(args, config, telemetry).await,
        Command::Tool(args) => match args.command {
            ToolCommand::List => tool::list(),
        },
    }
}

async fn run_command(
    args: RunArgs,
    mut config: RuntimeConfig,
    telemetry: Arc<Telemetry>,
) -> Result<ExitCode> {
    if let Some(name) = args.tool.as_deref() {
        return tool::invoke(name, &args.args).await;
    }

    if let Some(provider) = args.backend {
        config.backend.provider = provider;
    }
    if let Some(model) = args.model {
        config.backend.model = model;
    }
    if let Some(deadline_ms) = args.deadline_ms {
        config.engine.task_deadline_ms = deadline_ms;
    }
    config.validate()?;

    let goal = args
        .goal
        .context("--goal is required unless --tool is given")?;
    run::goal(&config, telemetry, goal, args.system).await
}

/// Registry holding every built-in tool.
fn builtin_registry() -> Result<ToolRegistry> {
    let registry = ToolRegistry::new();
    for tool in builtin::catalog() {
        registry
            .register_shared(Some(tool))
            .context("failed to register built-in tool")?;
    }
    Ok(registry)
}

fn build_backend(settings: &BackendSettings) -> Result<Arc<dyn GenerationBackend>> {
    match settings.provider {
        BackendProvider::Mock => Ok(Arc::new(KeywordToolBackend::new())),
        BackendProvider::Ollama => {
            let mut ollama = OllamaConfig::new(&settings.model).with_timeout(settings.timeout());
            if let Some(base_url) = settings.base_url.as_deref() {
                ollama = ollama.with_base_url(base_url)?;
            }
            let backend = OllamaBackend::new(ollama).context("failed to build Ollama backend")?;
            Ok(Arc::new(backend))
        }
    }
}
