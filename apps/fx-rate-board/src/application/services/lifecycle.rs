//! Cancellable background task handles.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A producer or timer did not stop cleanly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShutdownError {
    /// The task was still running when the grace period ran out.
    #[error("{component} did not stop within {grace:?}")]
    GracePeriodElapsed {
        /// Task name.
        component: &'static str,
        /// Grace period that was exceeded.
        grace: Duration,
    },
    /// The task panicked or was aborted.
    #[error("{component} failed: {message}")]
    TaskFailed {
        /// Task name.
        component: &'static str,
        /// Join error text.
        message: String,
    },
}

/// Handle to a spawned loop that stops cooperatively on cancellation.
#[derive(Debug)]
pub struct TaskHandle {
    name: &'static str,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl TaskHandle {
    /// Wrap a spawned task and the token it watches.
    #[must_use]
    pub const fn new(name: &'static str, cancel: CancellationToken, task: JoinHandle<()>) -> Self {
        Self { name, cancel, task }
    }

    /// Task name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Request a stop without waiting.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether the task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel and wait up to `grace` for the task to exit.
    ///
    /// A task still running after `grace` is aborted.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] if the task overran or failed.
    pub async fn shutdown(mut self, grace: Duration) -> Result<(), ShutdownError> {
        self.cancel.cancel();

        match tokio::time::timeout(grace, &mut self.task).await {
            Ok(Ok(())) => {
                tracing::debug!(component = self.name, "Task stopped");
                Ok(())
            }
            Ok(Err(e)) => Err(ShutdownError::TaskFailed {
                component: self.name,
                message: e.to_string(),
            }),
            Err(_) => {
                self.task.abort();
                Err(ShutdownError::GracePeriodElapsed {
                    component: self.name,
                    grace,
                })
            }
        }
    }
}
