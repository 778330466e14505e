//! Fire-and-forget background work with failure accounting.

use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use aether_telemetry::Telemetry;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Handle to a detached future running on the Tokio runtime.
///
/// Dropping the handle detaches the task; it keeps running. A failure or
/// panic is logged at `warn` and counted in
/// [`Telemetry::record_background_failure`].
#[derive(Debug)]
pub struct BackgroundTask {
    name: String,
    handle: JoinHandle<bool>,
}

impl BackgroundTask {
    /// Spawns `future` under `name`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn<F, E>(name: impl Into<String>, telemetry: Arc<Telemetry>, future: F) -> Self
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let name = name.into();
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            let reason = match AssertUnwindSafe(future).catch_unwind().await {
                Ok(Ok(())) => {
                    debug!(task = %task_name, "background task finished");
                    return true;
                }
                Ok(Err(err)) => err.to_string(),
                Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
            };
            telemetry.record_background_failure();
            warn!(task = %task_name, error = %reason, "background task failed");
            false
        });

        Self { name, handle }
    }

    /// Name given at spawn time.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` once the task has finished or been aborted.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancels the task at its next await point.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Waits for the task and reports whether it completed successfully.
    ///
    /// Aborted tasks report `false`.
    pub async fn join(self) -> bool {
        match self.handle.await {
            Ok(succeeded) => succeeded,
            Err(err) => {
                debug!(task = %self.name, error = %err, "background task did not complete");
                false
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn success_is_not_counted() {
        let telemetry = Arc::new(Telemetry::new("test", "0.0.0"));
        let task = BackgroundTask::spawn("refresh", Arc::clone(&telemetry), async {
            Ok::<(), String>(())
        });
        assert_eq!(task.name(), "refresh");
        assert!(task.join().await);
        assert_eq!(telemetry.snapshot().background_failures, 0);
    }

    #[tokio::test]
    async fn failure_is_logged_and_counted() {
        let telemetry = Arc::new(Telemetry::new("test", "0.0.0"));
        let task = BackgroundTask::spawn("refresh", Arc::clone(&telemetry), async {
            Err::<(), _>("token endpoint unreachable")
        });
        assert!(!task.join().await);
        assert_eq!(telemetry.snapshot().background_failures, 1);
    }

    #[tokio::test]
    async fn panic_is_counted() {
        let telemetry = Arc::new(Telemetry::new("test", "0.0.0"));
        let task = BackgroundTask::spawn("boom", Arc::clone(&telemetry), explode());
        assert!(!task.join().await);
        assert_eq!(telemetry.snapshot().background_failures, 1);
    }

    #[tokio::test]
    async fn dropped_handle_keeps_running() {
        let telemetry = Arc::new(Telemetry::new("test", "0.0.0"));
        let (tx, rx) = tokio::sync::oneshot::channel();
        let work = async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            tx.send(()).map_err(|()| "receiver gone")
        };
        drop(BackgroundTask::spawn("detached", Arc::clone(&telemetry), work));
        tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .expect("detached task completes")
            .unwrap();
    }

    #[tokio::test]
    async fn abort_cancels() {
        let telemetry = Arc::new(Telemetry::new("test", "0.0.0"));
        let task = BackgroundTask::spawn("sleeper", Arc::clone(&telemetry), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<(), String>(())
        });
        task.abort();
        assert!(!task.join().await);
        assert_eq!(telemetry.snapshot().background_failures, 0);
    }

    async fn explode() -> Result<(), String> {
        panic!("exploded")
    }
}
