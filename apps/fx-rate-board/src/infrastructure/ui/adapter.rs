//! Hub subscriber that hands rates to the UI context.

use crate::application::ports::RateSubscriber;
use crate::domain::rate::Rate;
use crate::infrastructure::metrics;

use super::dispatcher::UiDispatcher;

/// Forwards each published rate to a [`UiDispatcher`].
///
/// Runs on the publisher's thread and only enqueues an owned copy of the
/// rate, so `publish` never waits on UI work.
#[derive(Debug, Clone)]
pub struct UiSubscriber {
    description: String,
    dispatcher: UiDispatcher,
}

impl UiSubscriber {
    /// Wrap a dispatcher.
    #[must_use]
    pub fn new(description: impl Into<String>, dispatcher: UiDispatcher) -> Self {
        Self {
            description: description.into(),
            dispatcher,
        }
    }
}

impl RateSubscriber for UiSubscriber {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn on_rate_update(&self, rate: &Rate) {
        if let Err(e) = self.dispatcher.post_rate(rate.clone()) {
            tracing::debug!(
                subscriber = %self.description,
                instrument = %rate.instrument_key,
                error = %e,
                "Dropped rate for stopped UI context"
            );
            metrics::record_ui_dispatch_dropped();
        }
    }
}
