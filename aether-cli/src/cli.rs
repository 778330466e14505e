//! Command-line definitions.

use std::path::PathBuf;

use aether_config::BackendProvider;
use aether_telemetry::LogFormat;
use clap::{Args, Parser, Subcommand};

/// AetherCore: a minimal agent execution kernel.
#[derive(Parser, Debug)]
#[command(name = "aether")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log level (off, error, warn, info, debug, trace).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format (pretty or json).
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// TOML configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a goal through the engine, or invoke one tool directly.
    Run(RunArgs),

    /// Inspect the built-in tools.
    Tool(ToolArgs),
}

/// Arguments for `aether run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Goal handed to an ephemeral agent.
    #[arg(long, required_unless_present = "tool", conflicts_with = "tool")]
    pub goal: Option<String>,

    /// System directive sent ahead of the goal.
    #[arg(long)]
    pub system: Option<String>,

    /// Bypass the engine and execute this tool directly.
    #[arg(long)]
    pub tool: Option<String>,

    /// JSON arguments for `--tool`.
    #[arg(long, default_value = "{}")]
    pub args: String,

    /// Generation backend (mock or ollama).
    #[arg(long)]
    pub backend: Option<BackendProvider>,

    /// Model name for the backend.
    #[arg(long)]
    pub model: Option<String>,

    /// Task deadline in milliseconds.
    #[arg(long)]
    pub deadline_ms: Option<u64>,
}

/// Arguments for `aether tool`.
#[derive(Args, Debug)]
pub struct ToolArgs {
    #[command(subcommand)]
    pub command: ToolCommand,
}

/// Tool subcommands.
#[derive(Subcommand, Debug)]
pub enum ToolCommand {
    /// List built-in tools and their declared budgets.
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_goal_with_global_flags() {
        let cli = Cli::try_parse_from([
            "aether",
            "run",
            "--goal",
            "check system info",
            "--log-format",
            "json",
            "--backend",
            "ollama",
        ])
        .unwrap();

        assert_eq!(cli.log_format, Some(LogFormat::Json));
        let Command::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.goal.as_deref(), Some("check system info"));
        assert_eq!(args.backend, Some(BackendProvider::Ollama));
        assert_eq!(args.args, "{}");
    }

    #[test]
    fn run_requires_goal_or_tool() {
        assert!(Cli::try_parse_from(["aether", "run"]).is_err());
        let both = Cli::try_parse_from(["aether", "run", "--goal", "a", "--tool", "b"]);
        assert!(both.is_err());

        let args = ["aether", "run", "--tool", "sys_info"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Run(RunArgs { tool: Some(_), .. })
        ));
    }

    #[test]
    fn parses_tool_list() {
        let cli = Cli::try_parse_from(["aether", "tool", "list"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Tool(ToolArgs {
                command: ToolCommand::List,
            })
        ));
    }
}
