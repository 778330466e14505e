//! Per-task orchestration: one generation round, then best-effort tool calls.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use aether_adapters::{GenerationBackend, GenerationRequest, ToolCall};
use aether_telemetry::{Telemetry, format_latency};
use aether_tools::{ToolContext, ToolRegistry, WorkerGauge};
use futures::FutureExt;
use tokio::time::{Instant, timeout_at};
use tracing::{Instrument, debug, info, warn};

use crate::error::TaskError;
use crate::task::{Task, TaskOutcome};

/// Runs tasks to completion on behalf of a worker. Holds no per-task state.
#[derive(Clone)]
pub(crate) struct Orchestrator {
    backend: Arc<dyn GenerationBackend>,
    registry: Arc<ToolRegistry>,
    telemetry: Arc<Telemetry>,
    workers: WorkerGauge,
    task_deadline: Duration,
}

impl Orchestrator {
    pub(crate) fn new(
        backend: Arc<dyn GenerationBackend>,
        registry: Arc<ToolRegistry>,
        telemetry: Arc<Telemetry>,
        workers: WorkerGauge,
        task_deadline: Duration,
    ) -> Self {
        Self {
            backend,
            registry,
            telemetry,
            workers,
            task_deadline,
        }
    }

    /// Processes one task and always returns exactly one outcome.
    pub(crate) async fn run(&self, task: Task, worker_id: usize) -> TaskOutcome {
        let span = self.telemetry.task_span(task.id().as_str(), worker_id);
        self.run_inner(task).instrument(span).await
    }

    async fn run_inner(&self, task: Task) -> TaskOutcome {
        let started = Instant::now();
        let deadline = started + self.task_deadline;
        self.telemetry.record_task_started();
        info!("task started");

        let mut request =
            GenerationRequest::new(task.input()).with_tools(self.registry.manifests());
        if let Some(prompt) = task.system_prompt() {
            request = request.with_system_prompt(prompt);
        }

        let generated = timeout_at(deadline, self.backend.generate(request)).await;
        let response = match generated {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return self.fail(task, started, TaskError::Backend(err)),
            Err(_) => {
                return self.fail(
                    task,
                    started,
                    TaskError::DeadlineExceeded(self.task_deadline),
                );
            }
        };

        if response.has_tool_calls() {
            self.execute_tools(&task, &response.tool_calls, deadline)
                .await;
        }

        let duration = started.elapsed();
        self.telemetry.record_task_completed();
        info!(
            duration_ms = %format_latency(duration),
            total_tokens = response.usage.total_tokens,
            "task completed"
        );
        TaskOutcome::completed(task.id().clone(), response.content, duration)
    }

    fn fail(&self, task: Task, started: Instant, error: TaskError) -> TaskOutcome {
        let duration = started.elapsed();
        self.telemetry.record_task_failed();
        warn!(
            error = %error,
            duration_ms = %format_latency(duration),
            "task failed"
        );
        TaskOutcome::failed(task.id().clone(), error, duration)
    }

    /// Executes calls in backend order. Outputs are not fed back to the backend.
    async fn execute_tools(&self, task: &Task, calls: &[ToolCall], deadline: Instant) {
        let ctx = ToolContext::new()
            .with_task(task.id().clone())
            .with_deadline(deadline)
            .with_workers(self.workers.clone());
        let span = self.telemetry.component_span("tool_orchestrator");

        async {
            for call in calls {
                self.execute_call(&ctx, call, deadline).await;
            }
        }
        .instrument(span)
        .await;
    }

    /// Runs one call. Any failure is logged and counted as a skip.
    async fn execute_call(&self, ctx: &ToolContext, call: &ToolCall, deadline: Instant) {
        let handle = match self.registry.get(&call.name) {
            Ok(handle) => handle,
            Err(err) => {
                self.telemetry.record_tool_skipped();
                warn!(
                    tool_name = %call.name,
                    call_id = %call.id,
                    error = %err,
                    "tool not found in registry"
                );
                return;
            }
        };

        debug!(tool_name = %call.name, arguments = %call.arguments, "tool execution started");
        let started = Instant::now();
        let execution = AssertUnwindSafe(handle.execute(ctx, call.arguments.clone()));
        let executed = timeout_at(deadline, execution.catch_unwind()).await;
        let elapsed = format_latency(started.elapsed());

        match executed {
            Ok(Ok(Ok(_))) => {
                self.telemetry.record_tool_executed();
                info!(tool_name = %call.name, duration_ms = %elapsed, "tool execution completed");
            }
            Ok(Ok(Err(err))) => {
                self.telemetry.record_tool_skipped();
                warn!(
                    tool_name = %call.name,
                    duration_ms = %elapsed,
                    error = %err,
                    "tool execution failed"
                );
            }
            Ok(Err(_)) => {
                self.telemetry.record_tool_skipped();
                warn!(tool_name = %call.name, duration_ms = %elapsed, "tool execution panicked");
            }
            Err(_) => {
                self.telemetry.record_tool_skipped();
                warn!(
                    tool_name = %call.name,
                    duration_ms = %elapsed,
                    "tool execution exceeded task deadline"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use aether_adapters::mock::{KeywordToolBackend, MockBackend};
    use aether_tools::builtin::SysInfoTool;

    fn orchestrator(
        backend: Arc<dyn GenerationBackend>,
        registry: Arc<ToolRegistry>,
    ) -> (Orchestrator, Arc<Telemetry>) {
        let telemetry = Arc::new(Telemetry::new("test", "0.0.0"));
        let orchestrator = Orchestrator::new(
            backend,
            registry,
            Arc::clone(&telemetry),
            WorkerGauge::new(),
            Duration::from_secs(5),
        );
        (orchestrator, telemetry)
    }

    #[tokio::test]
    async fn direct_answer_skips_tools() {
        let (orchestrator, telemetry) = orchestrator(
            Arc::new(MockBackend::new("plain answer")),
            Arc::new(ToolRegistry::new()),
        );

        let outcome = orchestrator.run(Task::new("t-1", "hello"), 0).await;
        assert!(outcome.is_success());
        assert_eq!(outcome.output(), "plain answer");
        assert_eq!(outcome.task_id().as_str(), "t-1");

        let snapshot = telemetry.snapshot();
        assert_eq!(snapshot.tasks_completed, 1);
        assert_eq!(snapshot.tool_calls_executed, 0);
    }

    #[tokio::test]
    async fn tool_call_runs_and_output_is_not_fed_back() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(SysInfoTool).unwrap();
        let (orchestrator, telemetry) =
            orchestrator(Arc::new(KeywordToolBackend::new()), registry);

        let outcome = orchestrator
            .run(Task::new("t-2", "Give me System Info please"), 1)
            .await;
        assert!(outcome.is_success());
        assert_eq!(outcome.output(), "");
        assert_eq!(telemetry.snapshot().tool_calls_executed, 1);
    }

    #[tokio::test]
    async fn unresolved_tool_is_skipped() {
        let (orchestrator, telemetry) = orchestrator(
            Arc::new(KeywordToolBackend::new()),
            Arc::new(ToolRegistry::new()),
        );

        let outcome = orchestrator.run(Task::new("t-3", "system info"), 0).await;
        assert!(outcome.is_success());
        assert_eq!(telemetry.snapshot().tool_calls_skipped, 1);
    }
}
