//! Execution context handed to tools.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use aether_primitives::TaskId;
use tokio::time::Instant;

/// Shared counter of live worker loops.
///
/// The engine holds one gauge per instance; each worker holds a
/// [`WorkerGuard`] for as long as its loop runs.
#[derive(Clone, Debug, Default)]
pub struct WorkerGauge {
    live: Arc<AtomicUsize>,
}

impl WorkerGauge {
    /// Creates a gauge reading zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a live worker until the returned guard is dropped.
    #[must_use]
    pub fn enter(&self) -> WorkerGuard {
        self.live.fetch_add(1, Ordering::AcqRel);
        WorkerGuard {
            live: Arc::clone(&self.live),
        }
    }

    /// Returns the number of live workers.
    #[must_use]
    pub fn current(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }
}

/// RAII marker for one live worker.
#[derive(Debug)]
pub struct WorkerGuard {
    live: Arc<AtomicUsize>,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Per-invocation context for a tool.
#[derive(Clone, Debug, Default)]
pub struct ToolContext {
    task_id: Option<TaskId>,
    deadline: Option<Instant>,
    workers: WorkerGauge,
}

impl ToolContext {
    /// Creates a detached context with no task, no deadline and an empty gauge.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates the context with the task that requested the call.
    #[must_use]
    pub fn with_task(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    /// Sets the outer deadline the call runs under.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attaches the engine's worker gauge.
    #[must_use]
    pub fn with_workers(mut self, workers: WorkerGauge) -> Self {
        self.workers = workers;
        self
    }

    /// Returns the originating task, if any.
    #[must_use]
    pub fn task_id(&self) -> Option<&TaskId> {
        self.task_id.as_ref()
    }

    /// Returns the outer deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when unbounded.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Number of worker loops running in the owning engine.
    #[must_use]
    pub fn active_workers(&self) -> usize {
        self.workers.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_tracks_guards() {
        let gauge = WorkerGauge::new();
        let first = gauge.enter();
        let second = gauge.enter();
        assert_eq!(gauge.current(), 2);
        drop(first);
        assert_eq!(gauge.current(), 1);
        drop(second);
        assert_eq!(gauge.current(), 0);
    }

    #[tokio::test]
    async fn remaining_saturates_at_zero() {
        let ctx = ToolContext::new().with_deadline(Instant::now());
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
        assert!(ToolContext::new().remaining().is_none());
    }
}
