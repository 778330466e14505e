//! Process telemetry handle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{Span, info_span};

/// Explicitly constructed telemetry state shared by the kernel components.
///
/// Holds the boot clock, the service identity attached to every span, and
/// monotonic counters for task, tool, and background activity.
#[derive(Debug)]
pub struct Telemetry {
    service_name: String,
    service_version: String,
    started_at: Instant,
    tasks_started: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    tool_calls_executed: AtomicU64,
    tool_calls_skipped: AtomicU64,
    background_failures: AtomicU64,
}

impl Telemetry {
    /// Starts the boot clock for the named service.
    #[must_use]
    pub fn new(service_name: impl Into<String>, service_version: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: service_version.into(),
            started_at: Instant::now(),
            tasks_started: AtomicU64::new(0),
            tasks_completed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            tool_calls_executed: AtomicU64::new(0),
            tool_calls_skipped: AtomicU64::new(0),
            background_failures: AtomicU64::new(0),
        }
    }

    /// Service name attached to spans.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Service version attached to spans.
    #[must_use]
    pub fn service_version(&self) -> &str {
        &self.service_version
    }

    /// Time elapsed since this handle was constructed.
    #[must_use]
    pub fn boot_latency(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// [`boot_latency`](Self::boot_latency) rendered by [`format_latency`].
    #[must_use]
    pub fn format_boot_latency(&self) -> String {
        format_latency(self.boot_latency())
    }

    /// Span for a kernel subsystem, e.g. `tool_orchestrator`.
    #[must_use]
    pub fn component_span(&self, component: &'static str) -> Span {
        info_span!(
            "component",
            service.name = %self.service_name,
            service.version = %self.service_version,
            component
        )
    }

    /// Span covering one task on one worker.
    #[must_use]
    pub fn task_span(&self, task_id: &str, worker_id: usize) -> Span {
        info_span!(
            "task",
            service.name = %self.service_name,
            task_id,
            worker_id
        )
    }

    /// A worker picked up a task.
    pub fn record_task_started(&self) {
        self.tasks_started.fetch_add(1, Ordering::Relaxed);
    }

    /// A task finished without a task-level error.
    pub fn record_task_completed(&self) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// A task finished with a task-level error.
    pub fn record_task_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// A tool call ran to completion.
    pub fn record_tool_executed(&self) {
        self.tool_calls_executed.fetch_add(1, Ordering::Relaxed);
    }

    /// A tool call was skipped (unknown tool, failure, or deadline).
    pub fn record_tool_skipped(&self) {
        self.tool_calls_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// A detached background task failed.
    pub fn record_background_failure(&self) {
        self.background_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            tasks_started: self.tasks_started.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            tool_calls_executed: self.tool_calls_executed.load(Ordering::Relaxed),
            tool_calls_skipped: self.tool_calls_skipped.load(Ordering::Relaxed),
            background_failures: self.background_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new("aethercore", env!("CARGO_PKG_VERSION"))
    }
}

/// Counter values captured by [`Telemetry::snapshot`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TelemetrySnapshot {
    /// Tasks picked up by workers.
    pub tasks_started: u64,
    /// Tasks finished without error.
    pub tasks_completed: u64,
    /// Tasks finished with an error.
    pub tasks_failed: u64,
    /// Tool calls that completed.
    pub tool_calls_executed: u64,
    /// Tool calls that were skipped.
    pub tool_calls_skipped: u64,
    /// Background task failures.
    pub background_failures: u64,
}

/// Renders a latency as whole microseconds below one millisecond and whole
/// milliseconds otherwise. Zero renders as `0ms`.
#[must_use]
pub fn format_latency(latency: Duration) -> String {
    if latency.is_zero() {
        return "0ms".to_owned();
    }
    if latency < Duration::from_millis(1) {
        return format!("{}µs", latency.as_micros());
    }
    format!("{}ms", latency.as_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_latency_advances() {
        let telemetry = Telemetry::default();
        std::thread::sleep(Duration::from_millis(2));
        assert!(telemetry.boot_latency() >= Duration::from_millis(2));
        assert_ne!(telemetry.format_boot_latency(), "0ms");
    }

    #[test]
    fn formats_latency_units() {
        assert_eq!(format_latency(Duration::ZERO), "0ms");
        assert_eq!(format_latency(Duration::from_micros(250)), "250µs");
        assert_eq!(format_latency(Duration::from_millis(42)), "42ms");
        assert_eq!(format_latency(Duration::from_secs(2)), "2000ms");
    }

    #[test]
    fn counters_accumulate() {
        let telemetry = Telemetry::new("test", "0.0.0");
        telemetry.record_task_started();
        telemetry.record_task_started();
        telemetry.record_task_completed();
        telemetry.record_task_failed();
        telemetry.record_tool_executed();
        telemetry.record_tool_skipped();
        telemetry.record_background_failure();

        assert_eq!(
            telemetry.snapshot(),
            TelemetrySnapshot {
                tasks_started: 2,
                tasks_completed: 1,
                tasks_failed: 1,
                tool_calls_executed: 1,
                tool_calls_skipped: 1,
                background_failures: 1,
            }
        );
    }
}
