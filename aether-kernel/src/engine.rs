//! Bounded worker pool driving the orchestrator.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use aether_adapters::GenerationBackend;
use aether_telemetry::Telemetry;
use aether_tools::{Tool, ToolRegistry, WorkerGauge};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::lifecycle::{EngineEvent, EngineState, Lifecycle};
use crate::orchestrator::Orchestrator;
use crate::task::{Task, TaskOutcome};

/// Default outer deadline applied to each task.
pub const DEFAULT_TASK_DEADLINE: Duration = Duration::from_secs(5 * 60);

/// Sizing and deadline settings for an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    workers: NonZeroUsize,
    queue_capacity: NonZeroUsize,
    task_deadline: Duration,
}

impl EngineConfig {
    /// Creates a configuration with the default task deadline.
    #[must_use]
    pub const fn new(workers: NonZeroUsize, queue_capacity: NonZeroUsize) -> Self {
        Self {
            workers,
            queue_capacity,
            task_deadline: DEFAULT_TASK_DEADLINE,
        }
    }

    /// Overrides the outer deadline covering generation and tool calls.
    #[must_use]
    pub const fn with_task_deadline(mut self, task_deadline: Duration) -> Self {
        self.task_deadline = task_deadline;
        self
    }

    /// Number of workers spawned by [`Engine::start`].
    #[must_use]
    pub const fn workers(self) -> NonZeroUsize {
        self.workers
    }

    /// Capacity of the task queue and of the result queue.
    #[must_use]
    pub const fn queue_capacity(self) -> NonZeroUsize {
        self.queue_capacity
    }

    /// Outer deadline per task.
    #[must_use]
    pub const fn task_deadline(self) -> Duration {
        self.task_deadline
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(
            NonZeroUsize::new(4).expect("non-zero"),
            NonZeroUsize::new(100).expect("non-zero"),
        )
    }
}

/// Cloneable consumer handle for task outcomes.
///
/// Clones share one underlying queue, so each outcome is delivered to exactly
/// one caller of [`recv`](Self::recv).
#[derive(Debug, Clone)]
pub struct ResultStream {
    inner: Arc<Mutex<mpsc::Receiver<TaskOutcome>>>,
}

impl ResultStream {
    /// Waits for the next outcome.
    ///
    /// Returns `None` once the engine has stopped and every buffered outcome
    /// has been received.
    pub async fn recv(&self) -> Option<TaskOutcome> {
        self.inner.lock().await.recv().await
    }
}

type TaskQueue = Arc<Mutex<mpsc::Receiver<Task>>>;

/// Execution engine owning the task queue, result queue, and worker pool.
///
/// Tasks may be submitted before [`start`](Self::start); they wait in the
/// queue until workers run. [`stop`](Self::stop) is terminal. Tasks still
/// queued when it is called are abandoned and produce no outcome.
pub struct Engine {
    config: EngineConfig,
    lifecycle: Lifecycle,
    orchestrator: Orchestrator,
    registry: Arc<ToolRegistry>,
    telemetry: Arc<Telemetry>,
    gauge: WorkerGauge,
    task_tx: Option<mpsc::Sender<Task>>,
    task_rx: Option<TaskQueue>,
    result_tx: Option<mpsc::Sender<TaskOutcome>>,
    results: ResultStream,
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("state", &self.lifecycle.state())
            .field("live_workers", &self.gauge.current())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates an engine in the [`EngineState::Created`] state.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        backend: Arc<dyn GenerationBackend>,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        Self::with_telemetry(config, backend, registry, Arc::new(Telemetry::default()))
    }

    /// Creates an engine reporting into the supplied telemetry handle.
    #[must_use]
    pub fn with_telemetry(
        config: EngineConfig,
        backend: Arc<dyn GenerationBackend>,
        registry: Arc<ToolRegistry>,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        let capacity = config.queue_capacity().get();
        let (task_tx, task_rx) = mpsc::channel(capacity);
        let (result_tx, result_rx) = mpsc::channel(capacity);
        let (shutdown, _) = watch::channel(false);
        let gauge = WorkerGauge::new();

        let orchestrator = Orchestrator::new(
            backend,
            Arc::clone(&registry),
            Arc::clone(&telemetry),
            gauge.clone(),
            config.task_deadline(),
        );

        Self {
            config,
            lifecycle: Lifecycle::new(),
            orchestrator,
            registry,
            telemetry,
            gauge,
            task_tx: Some(task_tx),
            task_rx: Some(Arc::new(Mutex::new(task_rx))),
            result_tx: Some(result_tx),
            results: ResultStream {
                inner: Arc::new(Mutex::new(result_rx)),
            },
            shutdown,
            handles: Vec::new(),
        }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> EngineConfig {
        self.config
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.lifecycle.state()
    }

    /// Returns the registry consulted by every task.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Returns the telemetry handle.
    #[must_use]
    pub fn telemetry(&self) -> &Arc<Telemetry> {
        &self.telemetry
    }

    /// Number of worker loops currently running.
    #[must_use]
    pub fn live_workers(&self) -> usize {
        self.gauge.current()
    }

    /// Returns a handle for consuming outcomes.
    #[must_use]
    pub fn results(&self) -> ResultStream {
        self.results.clone()
    }

    /// Registers a tool before the engine starts.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Registry`] for duplicate names, invalid
    /// manifests, or once [`start`](Self::start) has sealed the registry.
    pub fn register_tool<T>(&self, tool: T) -> EngineResult<()>
    where
        T: Tool + 'static,
    {
        self.registry.register(tool).map_err(EngineError::from)
    }

    /// Seals the registry and spawns the configured number of workers.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransition`] when the engine is already
    /// running or has stopped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(&mut self) -> EngineResult<()> {
        self.lifecycle.transition(EngineEvent::Start)?;
        let queue = self.task_rx.clone().ok_or(EngineError::Closed)?;
        let results = self.result_tx.clone().ok_or(EngineError::Closed)?;
        self.registry.seal();

        let workers = self.config.workers().get();
        self.handles.reserve(workers);
        for worker_id in 0..workers {
            let worker = Worker {
                id: worker_id,
                orchestrator: self.orchestrator.clone(),
                queue: Arc::clone(&queue),
                results: results.clone(),
                shutdown: self.shutdown.subscribe(),
                gauge: self.gauge.clone(),
            };
            let span = self.telemetry.component_span("worker");
            let handle = tokio::spawn(worker.run().instrument(span));
            self.handles.push(handle);
        }

        info!(
            workers,
            queue_capacity = self.config.queue_capacity().get(),
            tools = self.registry.len(),
            boot_latency = %self.telemetry.format_boot_latency(),
            "engine started"
        );
        Ok(())
    }

    /// Enqueues a task without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::QueueFull`] when the task queue is at capacity and
    /// [`EngineError::Closed`] after [`stop`](Self::stop).
    pub fn submit(&self, task: Task) -> EngineResult<()> {
        let Some(sender) = self.task_tx.as_ref() else {
            return Err(EngineError::Closed);
        };
        sender.try_send(task).map_err(|err| match err {
            TrySendError::Full(task) => {
                debug!(task_id = %task.id(), "task queue full");
                EngineError::QueueFull
            }
            TrySendError::Closed(_) => EngineError::Closed,
        })
    }

    /// Signals every worker, waits for all of them to exit, then closes both
    /// queues.
    ///
    /// Workers finish the task they are processing before exiting, so this
    /// waits for in-flight outcomes to be delivered to the result queue.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransition`] when the engine has already
    /// stopped.
    pub async fn stop(&mut self) -> EngineResult<()> {
        self.lifecycle.transition(EngineEvent::Stop)?;
        self.shutdown.send_replace(true);

        for handle in self.handles.drain(..) {
            if let Err(err) = handle.await {
                warn!(error = %err, "worker terminated abnormally");
            }
        }

        self.task_tx = None;
        self.task_rx = None;
        self.result_tx = None;

        info!(snapshot = ?self.telemetry.snapshot(), "engine stopped");
        Ok(())
    }
}

struct Worker {
    id: usize,
    orchestrator: Orchestrator,
    queue: TaskQueue,
    results: mpsc::Sender<TaskOutcome>,
    shutdown: watch::Receiver<bool>,
    gauge: WorkerGauge,
}

impl Worker {
    async fn run(mut self) {
        let _live = self.gauge.enter();
        debug!(worker_id = self.id, "worker started");

        loop {
            let task = tokio::select! {
                biased;
                _ = self.shutdown.wait_for(|stop| *stop) => break,
                task = next_task(&self.queue) => match task {
                    Some(task) => task,
                    None => break,
                },
            };

            let outcome = self.orchestrator.run(task, self.id).await;
            if self.results.send(outcome).await.is_err() {
                warn!(worker_id = self.id, "result queue closed; dropping outcome");
                break;
            }
        }

        debug!(worker_id = self.id, "worker exited");
    }
}

async fn next_task(queue: &Mutex<mpsc::Receiver<Task>>) -> Option<Task> {
    queue.lock().await.recv().await
}
