//! The single-threaded UI context.
//!
//! `UiContext::run` is the only code that ever holds the
//! [`RateListViewModel`]. Everything else reaches it by posting a
//! [`UiMessage`] through a [`UiDispatcher`]; messages are handled one at a
//! time in queue order.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Local;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use super::decay::{DecayTimer, spawn_decay_timer};
use super::dispatcher::{UiDispatcher, UiMessage};
use crate::domain::presentation::{ApplyOutcome, DecayCurve, DecayProgress, RateListViewModel};
use crate::domain::rate::{InstrumentKey, Rate};
use crate::infrastructure::metrics;

/// Shortest status refresh period accepted.
const MIN_STATUS_INTERVAL: Duration = Duration::from_millis(1);

/// Owner of all presentation state.
#[derive(Debug)]
pub struct UiContext {
    rx: mpsc::UnboundedReceiver<UiMessage>,
    tx: mpsc::WeakUnboundedSender<UiMessage>,
    list: RateListViewModel,
    status_interval: Duration,
    cancel: CancellationToken,
    timers: HashMap<InstrumentKey, DecayTimer>,
}

impl UiContext {
    /// Create a context and the dispatcher that feeds it.
    ///
    /// Rows decay along `curve`. The status line and time-ago text refresh
    /// every `status_interval`.
    #[must_use]
    pub fn new(curve: DecayCurve, status_interval: Duration) -> (Self, UiDispatcher) {
        let (tx, rx) = mpsc::unbounded_channel();
        let context = Self {
            rx,
            tx: tx.downgrade(),
            list: RateListViewModel::new(curve),
            status_interval: status_interval.max(MIN_STATUS_INTERVAL),
            cancel: CancellationToken::new(),
            timers: HashMap::new(),
        };
        (context, UiDispatcher::new(tx))
    }

    /// The list, for attaching listeners before [`run`](Self::run).
    pub fn list_mut(&mut self) -> &mut RateListViewModel {
        &mut self.list
    }

    /// Token that stops the context and all of its timers.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Process messages until `Shutdown`, cancellation, or every dispatcher
    /// is dropped. Returns the final list.
    pub async fn run(mut self) -> RateListViewModel {
        let start = Instant::now() + self.status_interval;
        let mut status = interval_at(start, self.status_interval);
        status.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::debug!(
            status_interval_ms = self.status_interval.as_millis(),
            "UI context started"
        );

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    tracing::debug!("UI context cancelled");
                    break;
                }
                message = self.rx.recv() => {
                    match message {
                        Some(UiMessage::Shutdown) | None => break,
                        Some(message) => self.handle(message),
                    }
                }
                _ = status.tick() => {
                    self.list.refresh_status(&Local::now());
                }
            }
        }

        self.stop_timers();
        self.rx.close();
        tracing::info!(
            rows = self.list.len(),
            updates = self.list.update_count(),
            "UI context stopped"
        );
        self.list
    }

    fn handle(&mut self, message: UiMessage) {
        match message {
            UiMessage::RateUpdated(rate) => self.apply_rate(&rate),
            UiMessage::DecayStep {
                key,
                generation,
                step,
            } => self.apply_decay_step(&key, generation, step),
            UiMessage::RefreshStatus => self.list.refresh_status(&Local::now()),
            UiMessage::Invoke(task) => task(&mut self.list),
            UiMessage::Shutdown => {}
        }
    }

    fn apply_rate(&mut self, rate: &Rate) {
        let outcome = self.list.apply(rate);
        if let ApplyOutcome::Updated {
            pulse: Some(generation),
            ..
        } = outcome
        {
            self.restart_timer(&rate.instrument_key, generation);
        }
    }

    fn apply_decay_step(&mut self, key: &str, generation: u64, step: u32) {
        if self.list.advance_decay(key, generation, step) == DecayProgress::Finished
            && self
                .timers
                .get(key)
                .is_some_and(|t| t.generation == generation)
        {
            self.timers.remove(key);
        }
    }

    /// Cancel the row's current timer, if any, and start one for `generation`.
    fn restart_timer(&mut self, key: &str, generation: u64) {
        if let Some(previous) = self.timers.remove(key) {
            previous.cancel();
        }
        metrics::record_pulse_restart();

        let curve = self.list.curve();
        let Some(tx) = self.tx.upgrade() else {
            // Nobody can post the steps back; settle the row immediately.
            self.list.advance_decay(key, generation, curve.steps());
            return;
        };

        let (timer, _task) = spawn_decay_timer(
            tx,
            key.to_string(),
            generation,
            curve,
            self.cancel.child_token(),
        );
        self.timers.insert(key.to_string(), timer);
    }

    fn stop_timers(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.cancel();
        }
        self.cancel.cancel();
    }

    /// Rows with a decay timer in flight.
    #[must_use]
    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::presentation::{HighlightDirection, INITIAL_STATUS};

    fn rate(key: &str, mid: f64) -> Rate {
        Rate::from_quote(key, mid - 0.0005, mid + 0.0005, "TEST", Utc::now())
    }

    fn context() -> (UiContext, UiDispatcher) {
        UiContext::new(
            DecayCurve::new(10, Duration::from_millis(100)),
            Duration::from_secs(1),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn applies_rates_in_post_order() {
        let (ctx, ui) = context();
        let running = tokio::spawn(ctx.run());

        ui.post_rate(rate("EURUSD", 1.0850)).unwrap();
        ui.post_rate(rate("GBPUSD", 1.2650)).unwrap();
        ui.post_rate(rate("EURUSD", 1.0900)).unwrap();

        let (keys, direction) = ui
            .query(|list| {
                let keys: Vec<String> = list
                    .rows()
                    .iter()
                    .map(|r| r.instrument_key().to_string())
                    .collect();
                (keys, list.get("EURUSD").map(|r| r.highlight_direction()))
            })
            .await
            .unwrap();

        assert_eq!(keys, vec!["EURUSD", "GBPUSD"]);
        assert_eq!(direction, Some(HighlightDirection::Up));

        ui.shutdown().unwrap();
        let list = running.await.unwrap();
        assert_eq!(list.update_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn pulse_decays_to_zero_on_the_context() {
        let (ctx, ui) = context();
        let running = tokio::spawn(ctx.run());

        ui.post_rate(rate("EURUSD", 1.0850)).unwrap();
        ui.post_rate(rate("EURUSD", 1.0900)).unwrap();
        let start = ui
            .query(|list| list.get("EURUSD").map(|r| r.highlight_intensity()))
            .await
            .unwrap();
        assert_eq!(start, Some(1.0));

        tokio::time::sleep(Duration::from_millis(150)).await;

        let (intensity, decaying) = ui
            .query(|list| {
                let row = list.get("EURUSD").unwrap();
                (row.highlight_intensity(), row.is_decaying())
            })
            .await
            .unwrap();
        assert_eq!(intensity, 0.0);
        assert!(!decaying);

        ui.shutdown().unwrap();
        running.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn one_timer_per_row_until_its_final_step() {
        let (mut ctx, _ui) = context();

        ctx.handle(UiMessage::RateUpdated(rate("EURUSD", 1.0850)));
        assert_eq!(ctx.active_timers(), 0);

        ctx.handle(UiMessage::RateUpdated(rate("EURUSD", 1.0900)));
        ctx.handle(UiMessage::RateUpdated(rate("EURUSD", 1.0950)));
        assert_eq!(ctx.active_timers(), 1);

        let generation = ctx.list.get("EURUSD").unwrap().generation();
        ctx.handle(UiMessage::DecayStep {
            key: "EURUSD".to_string(),
            generation: generation - 1,
            step: 10,
        });
        assert_eq!(ctx.active_timers(), 1);

        ctx.handle(UiMessage::DecayStep {
            key: "EURUSD".to_string(),
            generation,
            step: 10,
        });
        assert_eq!(ctx.active_timers(), 0);
        assert_eq!(ctx.list.get("EURUSD").unwrap().highlight_intensity(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn status_refreshes_on_interval() {
        let (ctx, ui) = context();
        let running = tokio::spawn(ctx.run());

        ui.post_rate(rate("EURUSD", 1.0850)).unwrap();
        let status = ui.query(|l| l.status_text().to_string()).await.unwrap();
        assert_eq!(status, INITIAL_STATUS);

        tokio::time::sleep(Duration::from_millis(1_100)).await;

        let status = ui.query(|l| l.status_text().to_string()).await.unwrap();
        assert!(status.starts_with("Last Updated: "));
        assert!(status.ends_with("1 rates active - 1 updates received"));

        ui.shutdown().unwrap();
        running.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_dispatchers_dropped() {
        let (ctx, ui) = context();
        let running = tokio::spawn(ctx.run());
        ui.post_rate(rate("EURUSD", 1.0850)).unwrap();
        drop(ui);

        let list = running.await.unwrap();
        assert_eq!(list.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_pending_decay() {
        let (ctx, ui) = context();
        let cancel = ctx.cancellation_token();
        let running = tokio::spawn(ctx.run());

        ui.post_rate(rate("EURUSD", 1.0850)).unwrap();
        ui.post_rate(rate("EURUSD", 1.0800)).unwrap();
        ui.query(|_| ()).await.unwrap();
        cancel.cancel();

        let list = running.await.unwrap();
        assert!(list.get("EURUSD").unwrap().is_decaying());
        assert!(ui.is_closed());
    }
}
