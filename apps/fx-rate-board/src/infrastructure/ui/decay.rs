//! Highlight decay timers.
//!
//! A timer never touches view-model state. It only posts `DecayStep`
//! messages back to the UI context, which applies them in order and drops
//! any that belong to a superseded generation.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;

use super::dispatcher::UiMessage;
use crate::domain::presentation::DecayCurve;
use crate::domain::rate::InstrumentKey;

/// A running timer for one row.
#[derive(Debug)]
pub(super) struct DecayTimer {
    pub(super) generation: u64,
    cancel: CancellationToken,
}

impl DecayTimer {
    pub(super) fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Spawn a timer posting steps `1..=N` of `curve` at `T/N` intervals.
///
/// A zero-length curve posts only the final step.
pub(super) fn spawn_decay_timer(
    tx: mpsc::UnboundedSender<UiMessage>,
    key: InstrumentKey,
    generation: u64,
    curve: DecayCurve,
    cancel: CancellationToken,
) -> (DecayTimer, JoinHandle<()>) {
    let timer = DecayTimer {
        generation,
        cancel: cancel.clone(),
    };

    let task = tokio::spawn(async move {
        let period = curve.step_interval();
        let steps = curve.steps();

        if period.is_zero() {
            let _ = tx.send(UiMessage::DecayStep {
                key,
                generation,
                step: steps,
            });
            return;
        }

        let mut ticker = interval_at(Instant::now() + period, period);
        for step in 1..=steps {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }

            let message = UiMessage::DecayStep {
                key: key.clone(),
                generation,
                step,
            };
            if tx.send(message).is_err() {
                return;
            }
        }
    });

    (timer, task)
}
