//! Units of work and their outcomes.

use std::time::Duration;

use aether_primitives::TaskId;
use chrono::{DateTime, Utc};

use crate::error::TaskError;

/// One unit of work submitted to the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    system_prompt: Option<String>,
    input: String,
    created_at: DateTime<Utc>,
}

impl Task {
    /// Creates a task stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<TaskId>, input: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            system_prompt: None,
            input: input.into(),
            created_at: Utc::now(),
        }
    }

    /// Sets the system directive sent ahead of the input. Blank directives are dropped.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        self.system_prompt = (!prompt.trim().is_empty()).then_some(prompt);
        self
    }

    /// Caller-assigned identifier.
    #[must_use]
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// System directive, if any.
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// User input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// When the task was built.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Result produced exactly once for every task a worker consumed.
#[derive(Debug)]
pub struct TaskOutcome {
    task_id: TaskId,
    output: String,
    duration: Duration,
    error: Option<TaskError>,
}

impl TaskOutcome {
    pub(crate) fn completed(task_id: TaskId, output: String, duration: Duration) -> Self {
        Self {
            task_id,
            output,
            duration,
            error: None,
        }
    }

    pub(crate) fn failed(task_id: TaskId, error: TaskError, duration: Duration) -> Self {
        Self {
            task_id,
            output: String::new(),
            duration,
            error: Some(error),
        }
    }

    /// Identifier of the originating task.
    #[must_use]
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Generation content. Empty when the task failed.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Wall-clock time from pickup to outcome.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Task-level error, if generation failed.
    #[must_use]
    pub fn error(&self) -> Option<&TaskError> {
        self.error.as_ref()
    }

    /// Returns `true` when no task-level error occurred.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Splits the outcome into output text or error.
    ///
    /// # Errors
    ///
    /// Returns the task-level error when generation failed.
    pub fn into_result(self) -> Result<String, TaskError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.output),
        }
    }
}
