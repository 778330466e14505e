//! `aether tool list` and `aether run --tool`.

use std::process::ExitCode;

use aether_primitives::{TaskId, ToolManifest};
use aether_telemetry::format_latency;
use aether_tools::{ToolContext, ToolRegistry, WorkerGauge};
use anyhow::{Context, Result, bail};
use serde_json::Value;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info};

use super::builtin_registry;

const RULE: &str = "---------------------------------------------------------";

/// Prints the manifest table for every built-in tool.
pub fn list() -> Result<ExitCode> {
    let registry = builtin_registry()?;
    print!("{}", render_manifests(registry.manifests()));
    Ok(ExitCode::SUCCESS)
}

/// Invokes a built-in tool outside the engine and prints its JSON output.
pub async fn invoke(name: &str, raw_args: &str) -> Result<ExitCode> {
    info!(tool_name = name, "native tool execution started");
    let started = Instant::now();

    let args: Value = serde_json::from_str(raw_args)
        .with_context(|| format!("--args is not valid JSON: {raw_args}"))?;
    let registry = builtin_registry()?;
    let output = execute(&registry, name, args).await?;

    info!(
        tool_name = name,
        duration_ms = %format_latency(started.elapsed()),
        "native tool execution succeeded"
    );
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(ExitCode::SUCCESS)
}

/// Runs one tool under its manifest's runtime budget.
async fn execute(registry: &ToolRegistry, name: &str, args: Value) -> Result<Value> {
    let started = Instant::now();
    let handle = registry.get(name)?;

    // Direct invocation runs on the caller's task, so it counts as one worker.
    let workers = WorkerGauge::new();
    let _live = workers.enter();
    // A zero budget means the manifest declares no limit.
    let budget = handle.manifest().max_runtime();
    let deadline = (!budget.is_zero()).then(|| started + budget);
    let mut ctx = ToolContext::new()
        .with_task(TaskId::random())
        .with_workers(workers.clone());
    if let Some(deadline) = deadline {
        ctx = ctx.with_deadline(deadline);
    }
    debug!(setup_latency = %format_latency(started.elapsed()), "executing tool");

    let execution = handle.execute(&ctx, args);
    let executed = match deadline {
        Some(deadline) => match timeout_at(deadline, execution).await {
            Ok(executed) => executed,
            Err(_) => {
                let budget_ms = budget.as_millis();
                bail!("tool `{name}` exceeded its {budget_ms}ms runtime budget")
            }
        },
        None => execution.await,
    };
    executed.with_context(|| format!("tool `{name}` failed"))
}

/// Renders manifests as a fixed-width table, sorted by name.
pub fn render_manifests(mut manifests: Vec<ToolManifest>) -> String {
    manifests.sort_by(|a, b| a.name().cmp(b.name()));

    let mut out = format!("Available Native Tools:\n{RULE}\n");
    out.push_str(&row("NAME", "CAPABILITIES", "LIMITS (ms/MB)", "DESCRIPTION"));
    out.push_str(RULE);
    out.push('\n');

    for manifest in &manifests {
        let capabilities = manifest
            .capabilities()
            .iter()
            .map(|cap| cap.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let limits = format!(
            "{}ms / {}MB",
            manifest.max_runtime_ms(),
            manifest.memory_limit_mb()
        );
        out.push_str(&row(
            manifest.name(),
            &capabilities,
            &limits,
            manifest.description(),
        ));
    }
    out
}

fn row(name: &str, capabilities: &str, limits: &str, description: &str) -> String {
    format!("{name:<15} | {capabilities:<12} | {limits:<15} | {description}\n")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use aether_primitives::Capability;
    use aether_tools::FnTool;
    use serde_json::json;

    #[test]
    fn table_lists_each_manifest_once() {
        let manifests = vec![
            ToolManifest::new("zeta", "last").unwrap(),
            ToolManifest::new("alpha", "first")
                .unwrap()
                .with_capabilities([Capability::Network, Capability::State])
                .with_max_runtime_ms(250)
                .with_memory_limit_mb(8),
        ];

        let table = render_manifests(manifests);
        let rows: Vec<&str> = table.lines().skip(4).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("alpha"));
        assert!(rows[0].contains("network,state"));
        assert!(rows[0].contains("250ms / 8MB"));
        assert!(rows[1].starts_with("zeta"));
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        assert!(invoke("missing", "{}").await.is_err());
    }

    #[tokio::test]
    async fn malformed_args_are_rejected() {
        assert!(invoke("sys_info", "{not json").await.is_err());
    }

    #[tokio::test]
    async fn direct_invocation_enforces_runtime_budget() {
        let registry = ToolRegistry::new();
        let manifest = ToolManifest::new("sleepy", "Outlives its budget")
            .unwrap()
            .with_max_runtime_ms(20);
        registry
            .register(FnTool::new(manifest, |_args: Value| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Value::Null)
            }))
            .unwrap();

        let err = execute(&registry, "sleepy", Value::Null)
            .await
            .expect_err("budget elapses first");
        assert!(err.to_string().contains("20ms runtime budget"));
    }

    #[tokio::test]
    async fn zero_budget_is_unbounded() {
        let registry = ToolRegistry::new();
        let manifest = ToolManifest::new("unbounded", "Declares no budget").unwrap();
        registry
            .register(FnTool::new(manifest, |args: Value| async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(args)
            }))
            .unwrap();

        let output = execute(&registry, "unbounded", json!({"n": 1}))
            .await
            .unwrap();
        assert_eq!(output, json!({"n": 1}));
    }

    #[tokio::test]
    async fn sys_info_runs_directly() {
        assert!(invoke("sys_info", "{}").await.is_ok());
    }
}
