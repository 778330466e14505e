//! Lifecycle state machine for the execution engine.

use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// States an engine moves through. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Constructed; tasks may be queued but no worker runs.
    Created,
    /// Workers are consuming the task queue.
    Running,
    /// Workers have exited and both queues are closed.
    Stopped,
}

impl EngineState {
    /// Returns `true` while workers are running.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns `true` once the engine has stopped.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped)
    }
}

/// Events that drive [`EngineState`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Spawn the worker pool.
    Start,
    /// Signal workers and close the queues.
    Stop,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Lifecycle {
    state: EngineState,
}

impl Lifecycle {
    pub(crate) const fn new() -> Self {
        Self {
            state: EngineState::Created,
        }
    }

    pub(crate) const fn state(self) -> EngineState {
        self.state
    }

    pub(crate) fn transition(&mut self, event: EngineEvent) -> EngineResult<EngineState> {
        let next = match (self.state, event) {
            (EngineState::Created, EngineEvent::Start) => EngineState::Running,
            (EngineState::Created | EngineState::Running, EngineEvent::Stop) => {
                EngineState::Stopped
            }
            (from, event) => return Err(EngineError::InvalidTransition { from, event }),
        };

        debug!(from = ?self.state, to = ?next, ?event, "engine lifecycle transition");
        self.state = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_then_stop() {
        let mut lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), EngineState::Created);
        let running = lifecycle.transition(EngineEvent::Start).unwrap();
        assert!(running.is_running());
        let stopped = lifecycle.transition(EngineEvent::Stop).unwrap();
        assert!(stopped.is_terminal());
    }

    #[test]
    fn stop_without_start_is_allowed() {
        let mut lifecycle = Lifecycle::new();
        assert_eq!(
            lifecycle.transition(EngineEvent::Stop).unwrap(),
            EngineState::Stopped
        );
    }

    #[test]
    fn rejected_transitions_leave_state_untouched() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.transition(EngineEvent::Start).unwrap();

        let err = lifecycle
            .transition(EngineEvent::Start)
            .expect_err("double start");
        assert!(matches!(
            err,
            EngineError::InvalidTransition {
                from: EngineState::Running,
                event: EngineEvent::Start
            }
        ));
        assert_eq!(lifecycle.state(), EngineState::Running);

        lifecycle.transition(EngineEvent::Stop).unwrap();
        for event in [EngineEvent::Start, EngineEvent::Stop] {
            assert!(lifecycle.transition(event).is_err());
        }
        assert_eq!(lifecycle.state(), EngineState::Stopped);
    }
}
