//! Cross-thread handle for posting work onto the UI context.

use std::fmt;

use tokio::sync::{mpsc, oneshot};

use crate::domain::presentation::RateListViewModel;
use crate::domain::rate::{InstrumentKey, Rate};

/// Closure run on the UI context with exclusive access to the list.
pub type UiTask = Box<dyn FnOnce(&mut RateListViewModel) + Send>;

/// A unit of work for the UI context.
pub enum UiMessage {
    /// Apply a published rate.
    RateUpdated(Rate),
    /// Advance one row's highlight decay.
    DecayStep {
        /// Instrument key.
        key: InstrumentKey,
        /// Decay generation the step was scheduled for.
        generation: u64,
        /// Step number, 1-indexed.
        step: u32,
    },
    /// Recompute the status line and time-ago text now.
    RefreshStatus,
    /// Run a closure against the list.
    Invoke(UiTask),
    /// Stop the context after everything queued before this message.
    Shutdown,
}

impl fmt::Debug for UiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateUpdated(rate) => f.debug_tuple("RateUpdated").field(&rate.instrument_key).finish(),
            Self::DecayStep {
                key,
                generation,
                step,
            } => f
                .debug_struct("DecayStep")
                .field("key", key)
                .field("generation", generation)
                .field("step", step)
                .finish(),
            Self::RefreshStatus => f.write_str("RefreshStatus"),
            Self::Invoke(_) => f.write_str("Invoke(..)"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// The UI context has stopped and no longer accepts work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The context's queue is closed.
    #[error("UI context is closed")]
    Closed,
}

/// Cloneable sender onto the UI context's FIFO queue.
///
/// Posting never blocks. Messages from one sender are processed in the
/// order they were posted.
#[derive(Debug, Clone)]
pub struct UiDispatcher {
    tx: mpsc::UnboundedSender<UiMessage>,
}

impl UiDispatcher {
    pub(super) const fn new(tx: mpsc::UnboundedSender<UiMessage>) -> Self {
        Self { tx }
    }

    /// Enqueue a message.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Closed`] if the context has stopped.
    pub fn post(&self, message: UiMessage) -> Result<(), DispatchError> {
        self.tx.send(message).map_err(|_| DispatchError::Closed)
    }

    /// Enqueue a rate update.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Closed`] if the context has stopped.
    pub fn post_rate(&self, rate: Rate) -> Result<(), DispatchError> {
        self.post(UiMessage::RateUpdated(rate))
    }

    /// Enqueue a closure without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Closed`] if the context has stopped.
    pub fn invoke<F>(&self, task: F) -> Result<(), DispatchError>
    where
        F: FnOnce(&mut RateListViewModel) + Send + 'static,
    {
        self.post(UiMessage::Invoke(Box::new(task)))
    }

    /// Run a closure on the UI context and wait for its result.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Closed`] if the context stopped before the
    /// closure ran.
    pub async fn query<F, R>(&self, task: F) -> Result<R, DispatchError>
    where
        F: FnOnce(&mut RateListViewModel) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.invoke(move |list| {
            let _ = reply_tx.send(task(list));
        })?;
        reply_rx.await.map_err(|_| DispatchError::Closed)
    }

    /// Ask the context to stop once the queue ahead of this is drained.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Closed`] if the context has already stopped.
    pub fn shutdown(&self) -> Result<(), DispatchError> {
        self.post(UiMessage::Shutdown)
    }

    /// Whether the context has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
