//! Execution engine for the Aether kernel.
//!
//! An [`Engine`] owns a bounded task queue, a bounded result queue and a fixed
//! pool of Tokio workers. Each worker takes one [`Task`], asks the configured
//! [`GenerationBackend`](aether_adapters::GenerationBackend) for a response
//! under the task deadline, runs any requested tools best-effort against the
//! shared [`ToolRegistry`](aether_tools::ToolRegistry), and emits exactly one
//! [`TaskOutcome`].

#![warn(missing_docs, clippy::pedantic)]

mod background;
mod engine;
mod error;
mod lifecycle;
mod orchestrator;
mod task;

pub use background::BackgroundTask;
pub use engine::{DEFAULT_TASK_DEADLINE, Engine, EngineConfig, ResultStream};
pub use error::{EngineError, EngineResult, TaskError};
pub use lifecycle::{EngineEvent, EngineState};
pub use task::{Task, TaskOutcome};
