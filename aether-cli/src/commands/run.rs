//! `aether run --goal`.

use std::num::NonZeroUsize;
use std::process::ExitCode;
use std::sync::Arc;

use aether_config::RuntimeConfig;
use aether_kernel::{Engine, EngineConfig, Task};
use aether_primitives::TaskId;
use aether_telemetry::{Telemetry, format_latency};
use anyhow::{Context, Result};
use tokio::time::Instant;
use tracing::{error, info, warn};

use super::{EXIT_INTERRUPTED, build_backend, builtin_registry};

/// Runs one goal through a freshly started engine and prints its output.
pub async fn goal(
    config: &RuntimeConfig,
    telemetry: Arc<Telemetry>,
    goal: String,
    system: Option<String>,
) -> Result<ExitCode> {
    let started = Instant::now();
    let backend = build_backend(&config.backend)?;
    let registry = Arc::new(builtin_registry()?);

    let engine_config = EngineConfig::new(
        NonZeroUsize::new(config.engine.workers).context("engine.workers must be at least 1")?,
        NonZeroUsize::new(config.engine.queue_capacity)
            .context("engine.queue_capacity must be at least 1")?,
    )
    .with_task_deadline(config.engine.task_deadline());

    info!(
        provider = backend.metadata().provider(),
        model = backend.metadata().model(),
        workers = config.engine.workers,
        "engine starting"
    );

    let mut engine = Engine::with_telemetry(engine_config, backend, registry, telemetry);
    engine.start()?;

    let mut task = Task::new(TaskId::random(), goal);
    if let Some(system) = system {
        task = task.with_system_prompt(system);
    }
    let task_id = task.id().clone();
    engine.submit(task)?;

    let results = engine.results();
    let outcome = tokio::select! {
        outcome = results.recv() => outcome,
        () = shutdown_signal() => {
            warn!(action = "shutting_down_worker_pool", "interrupt received");
            engine.stop().await?;
            info!(uptime = %format_latency(started.elapsed()), "shutdown complete");
            return Ok(ExitCode::from(EXIT_INTERRUPTED));
        }
    };
    engine.stop().await?;

    let outcome = outcome.context("engine stopped before producing an outcome")?;
    let duration = format_latency(outcome.duration());
    if let Some(err) = outcome.error() {
        error!(task_id = %task_id, error = %err, duration_ms = %duration, "task execution failed");
        return Ok(ExitCode::FAILURE);
    }

    info!(task_id = %task_id, duration_ms = %duration, "task execution succeeded");
    if !outcome.output().is_empty() {
        println!("{}", outcome.output());
    }
    Ok(ExitCode::SUCCESS)
}

/// Resolves on Ctrl-C, or on SIGTERM where supported.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "unable to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {}
        () = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_goal_succeeds() {
        let config = RuntimeConfig::default();
        let telemetry = Arc::new(Telemetry::new("test", "0.0.0"));
        goal(
            &config,
            Arc::clone(&telemetry),
            "show me the system info".to_owned(),
            None,
        )
        .await
        .unwrap();

        let snapshot = telemetry.snapshot();
        assert_eq!(snapshot.tasks_completed, 1);
        assert_eq!(snapshot.tool_calls_executed, 1);
    }
}
