//! Error types surfaced by the engine.

use std::time::Duration;

use aether_adapters::BackendError;
use aether_tools::ToolError;
use thiserror::Error;

use crate::lifecycle::{EngineEvent, EngineState};

/// Errors returned by [`Engine`](crate::Engine) operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The bounded task queue is at capacity.
    #[error("task queue is full")]
    QueueFull,

    /// The engine has stopped and no longer accepts tasks.
    #[error("engine is closed")]
    Closed,

    /// The requested lifecycle event is not allowed from the current state.
    #[error("invalid engine transition from {from:?} via {event:?}")]
    InvalidTransition {
        /// State prior to the attempted transition.
        from: EngineState,
        /// Event that was rejected.
        event: EngineEvent,
    },

    /// Tool registration failed.
    #[error(transparent)]
    Registry(#[from] ToolError),
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Task-level failure carried by a [`TaskOutcome`](crate::TaskOutcome).
///
/// Tool failures never appear here; they are logged and skipped.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The generation backend returned an error.
    #[error("generation failed: {0}")]
    Backend(#[from] BackendError),

    /// Generation did not finish within the task deadline.
    #[error("task deadline of {}ms exceeded", .0.as_millis())]
    DeadlineExceeded(Duration),
}
