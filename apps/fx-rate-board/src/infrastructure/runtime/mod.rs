//! Board Runtime
//!
//! Wires the hub, the UI context, the generator and the snapshot monitor
//! together, and tears them down in order.
//!
//! # Shutdown Order
//!
//! 1. Stop the generator and the monitor, each within the grace period
//! 2. Remove every hub subscription
//! 3. Post `Shutdown` to the UI context, which cancels its timers
//! 4. Await the UI context and hand back its final list

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::ports::RatePublisher;
use crate::application::services::{
    GeneratorHandle, Instrument, RateGenerator, ShutdownError, TaskHandle, default_universe,
};
use crate::domain::presentation::RateListViewModel;
use crate::domain::subscription::{SubscriptionFilter, SubscriptionHandle};
use crate::infrastructure::config::BoardConfig;
use crate::infrastructure::hub::{MarketHub, SharedMarketHub, SnapshotMonitor};
use crate::infrastructure::ui::{UiContext, UiDispatcher, UiSubscriber};

const UI_COMPONENT: &str = "ui_context";

/// A running board.
#[derive(Debug)]
pub struct BoardRuntime {
    hub: SharedMarketHub,
    dispatcher: UiDispatcher,
    subscription: SubscriptionHandle,
    generator: GeneratorHandle,
    monitor: TaskHandle,
    ui_task: JoinHandle<RateListViewModel>,
    cancel: CancellationToken,
    grace: Duration,
}

impl BoardRuntime {
    /// Start a board over the default universe.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(config: &BoardConfig) -> Self {
        Self::start_with(config, default_universe(), |_| {})
    }

    /// Start a board over `universe`, letting `configure_ui` attach
    /// listeners to the list before the UI context starts.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start_with<F>(config: &BoardConfig, universe: Vec<Instrument>, configure_ui: F) -> Self
    where
        F: FnOnce(&mut RateListViewModel),
    {
        let cancel = CancellationToken::new();
        let hub = MarketHub::shared();

        let (mut context, dispatcher) = UiContext::new(config.pulse.curve(), config.ui.status_interval);
        configure_ui(context.list_mut());
        let ui_task = tokio::spawn(context.run());

        let subscriber = UiSubscriber::new("rate_board_ui", dispatcher.clone());
        let subscription = hub.subscribe_and_load(Arc::new(subscriber), SubscriptionFilter::All);

        let publisher: Arc<dyn RatePublisher> = hub.clone();
        let generator = RateGenerator::new(publisher, universe, config.generator.generator_config())
            .spawn(cancel.child_token());

        let monitor =
            SnapshotMonitor::new(Arc::clone(&hub), config.monitor.interval).spawn(cancel.child_token());

        tracing::info!(
            tick_interval_ms = config.generator.tick_interval.as_millis(),
            pulse_steps = config.pulse.steps,
            pulse_duration_ms = config.pulse.duration.as_millis(),
            "Rate board started"
        );

        Self {
            hub,
            dispatcher,
            subscription,
            generator,
            monitor,
            ui_task,
            cancel,
            grace: config.shutdown.grace,
        }
    }

    /// The market hub.
    #[must_use]
    pub const fn hub(&self) -> &SharedMarketHub {
        &self.hub
    }

    /// Dispatcher onto the UI context.
    #[must_use]
    pub const fn dispatcher(&self) -> &UiDispatcher {
        &self.dispatcher
    }

    /// Stop everything and return the final list.
    ///
    /// Producers that overrun the grace period are aborted and logged; they
    /// do not prevent the rest of the shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] if the UI context fails or overruns, in
    /// which case its list is lost.
    pub async fn shutdown(self) -> Result<RateListViewModel, ShutdownError> {
        tracing::info!("Shutting down rate board");

        self.cancel.cancel();
        for handle in [self.generator, self.monitor] {
            let name = handle.name();
            if let Err(e) = handle.shutdown(self.grace).await {
                tracing::warn!(component = name, error = %e, "Producer did not stop cleanly");
            }
        }

        self.hub.unsubscribe(self.subscription);
        self.hub.shutdown();

        if self.dispatcher.shutdown().is_err() {
            tracing::debug!("UI context already stopped");
        }

        let mut ui_task = self.ui_task;
        match tokio::time::timeout(self.grace, &mut ui_task).await {
            Ok(Ok(list)) => {
                tracing::info!(
                    rows = list.len(),
                    updates = list.update_count(),
                    publishes = self.hub.publish_count(),
                    "Rate board stopped"
                );
                Ok(list)
            }
            Ok(Err(e)) => Err(ShutdownError::TaskFailed {
                component: UI_COMPONENT,
                message: e.to_string(),
            }),
            Err(_) => {
                ui_task.abort();
                Err(ShutdownError::GracePeriodElapsed {
                    component: UI_COMPONENT,
                    grace: self.grace,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::{GeneratorSettings, PulseSettings};

    fn config() -> BoardConfig {
        BoardConfig {
            generator: GeneratorSettings {
                seed: Some(11),
                ..GeneratorSettings::default()
            },
            pulse: PulseSettings {
                steps: 10,
                duration: Duration::from_millis(100),
            },
            ..BoardConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn board_fills_and_shuts_down() {
        let runtime = BoardRuntime::start(&config());

        tokio::time::sleep(Duration::from_secs(3)).await;
        let hub = Arc::clone(runtime.hub());
        let list = runtime.shutdown().await.unwrap();

        assert_eq!(list.len(), hub.instrument_count());
        assert_eq!(list.update_count(), hub.publish_count());
        assert_eq!(hub.subscriber_count(), 0);
        assert!(list.rows().iter().all(|row| row.source() == "MARKET_SIMULATOR"));
    }

    #[tokio::test(start_paused = true)]
    async fn configure_ui_runs_before_start() {
        let runtime = BoardRuntime::start_with(&config(), default_universe(), |list| {
            list.set_status_text("Connecting...");
        });

        let status = runtime
            .dispatcher()
            .query(|list| list.status_text().to_string())
            .await
            .unwrap();
        assert_eq!(status, "Connecting...");

        runtime.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn no_publishes_after_shutdown() {
        let runtime = BoardRuntime::start(&config());
        tokio::time::sleep(Duration::from_millis(600)).await;

        let hub = Arc::clone(runtime.hub());
        runtime.shutdown().await.unwrap();
        let count = hub.publish_count();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(hub.publish_count(), count);
    }
}
