//! Market Hub
//!
//! Fan-out point between rate producers and subscribers. Owns the canonical
//! rate table and the subscriber registry.
//!
//! # Locking
//!
//! ```text
//! publish_lock (Mutex)     serialises publish and subscribe_and_load
//!   ├── table (RwLock)     Arc<RateStore>, copy-on-write
//!   └── subscribers (RwLock) Arc<Vec<Registration>>, copy-on-write
//! ```
//!
//! A publish takes the subscriber list snapshot before touching the table.
//! A `subscribe` that completes while a publish is in flight is therefore
//! not part of that publish, but is part of every later one.
//!
//! Handlers run on the publisher's thread while `publish_lock` is held. This
//! keeps delivery order per subscriber equal to publish order. Handlers must
//! hand work off quickly and must not call `publish` or `subscribe_and_load`
//! from inside the callback.

mod monitor;

pub use monitor::SnapshotMonitor;

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use crate::application::ports::{PublishReport, RatePublisher, RateSubscriber};
use crate::domain::rate::{InstrumentKey, Rate, RateStore, ValidationError};
use crate::domain::subscription::{
    SubscriberError, SubscriberRegistry, SubscriptionFilter, SubscriptionHandle, SubscriptionStats,
};
use crate::infrastructure::metrics;

/// Shared handle to the hub.
pub type SharedMarketHub = Arc<MarketHub>;

type Subscriber = Arc<dyn RateSubscriber>;

// =============================================================================
// Snapshot
// =============================================================================

/// Immutable view of the rate table at one point in time.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    store: Arc<RateStore>,
}

impl MarketSnapshot {
    /// Rate for an instrument.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Rate> {
        self.store.get(key)
    }

    /// Number of instruments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the table was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Iterate over all rates in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&InstrumentKey, &Rate)> {
        self.store.iter()
    }

    /// Owned copy of the table.
    #[must_use]
    pub fn to_map(&self) -> HashMap<InstrumentKey, Rate> {
        self.store.to_map()
    }
}

// =============================================================================
// Hub
// =============================================================================

/// Canonical rate table plus synchronous fan-out to subscribers.
#[derive(Default)]
pub struct MarketHub {
    table: RwLock<Arc<RateStore>>,
    subscribers: RwLock<SubscriberRegistry<Subscriber>>,
    publish_lock: Mutex<()>,
    publish_count: AtomicU64,
}

impl fmt::Debug for MarketHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketHub")
            .field("instruments", &self.instrument_count())
            .field("subscribers", &self.subscriber_count())
            .field("publish_count", &self.publish_count())
            .finish_non_exhaustive()
    }
}

impl MarketHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hub already wrapped for sharing.
    #[must_use]
    pub fn shared() -> SharedMarketHub {
        Arc::new(Self::new())
    }

    /// Store `rate` and deliver a copy to every matching subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for a malformed rate. The table and
    /// subscribers are left untouched.
    pub fn publish(&self, rate: Rate) -> Result<PublishReport, ValidationError> {
        if let Err(e) = rate.validate() {
            tracing::warn!(instrument = %rate.instrument_key, error = %e, "Rejected rate");
            metrics::record_rate_rejected(&e);
            return Err(e);
        }

        let started = Instant::now();
        let _guard = self.publish_lock.lock();

        let entries = self.subscribers.read().entries();

        let instruments = {
            let mut table = self.table.write();
            Arc::make_mut(&mut *table).upsert(rate.clone());
            table.len()
        };
        self.publish_count.fetch_add(1, Ordering::Relaxed);

        let mut report = PublishReport::default();
        for entry in entries
            .iter()
            .filter(|e| e.filter.matches(&rate.instrument_key))
        {
            if deliver(&entry.subscriber, &rate) {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }

        metrics::record_rate_published(&rate.instrument_key);
        metrics::set_instruments(instruments);
        metrics::record_publish_duration(started.elapsed());

        tracing::trace!(
            instrument = %rate.instrument_key,
            mid = rate.mid,
            delivered = report.delivered,
            failed = report.failed,
            "Published rate"
        );

        Ok(report)
    }

    /// Register a handler for future publishes that match `filter`.
    pub fn subscribe(&self, handler: Subscriber, filter: SubscriptionFilter) -> SubscriptionHandle {
        let description = handler.description();
        let (handle, count) = {
            let mut registry = self.subscribers.write();
            let handle = registry.register(handler, filter);
            (handle, registry.len())
        };

        metrics::set_subscribers(count);
        tracing::info!(
            subscription_id = handle.id(),
            subscriber = %description,
            "Subscriber registered"
        );
        handle
    }

    /// Register a handler and replay the current matching table to it.
    ///
    /// Runs under the publish lock, so the handler sees every instrument
    /// exactly once, either in the replay or in a later publish.
    pub fn subscribe_and_load(
        &self,
        handler: Subscriber,
        filter: SubscriptionFilter,
    ) -> SubscriptionHandle {
        let _guard = self.publish_lock.lock();

        let replay = self.snapshot();
        let handle = self.subscribe(Arc::clone(&handler), filter.clone());

        let mut replayed = 0_usize;
        for (_, rate) in replay.iter().filter(|(key, _)| filter.matches(key)) {
            deliver(&handler, rate);
            replayed += 1;
        }

        tracing::debug!(
            subscription_id = handle.id(),
            replayed,
            "Replayed snapshot to new subscriber"
        );
        handle
    }

    /// Remove a registration. Unknown or repeated handles are a no-op.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let (removed, count) = {
            let mut registry = self.subscribers.write();
            let removed = registry.unregister(handle);
            (removed, registry.len())
        };

        if removed {
            metrics::set_subscribers(count);
            tracing::info!(subscription_id = handle.id(), "Subscriber removed");
        } else {
            tracing::debug!(subscription_id = handle.id(), "Unsubscribe for unknown handle ignored");
        }
        removed
    }

    /// Consistent copy of the full table.
    #[must_use]
    pub fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            store: Arc::clone(&*self.table.read()),
        }
    }

    /// Latest rate for one instrument.
    #[must_use]
    pub fn rate(&self, key: &str) -> Option<Rate> {
        self.table.read().get(key).cloned()
    }

    /// Registered subscriber count.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Subscriber breakdown by filter kind.
    #[must_use]
    pub fn subscription_stats(&self) -> SubscriptionStats {
        self.subscribers.read().stats()
    }

    /// Instruments in the table.
    #[must_use]
    pub fn instrument_count(&self) -> usize {
        self.table.read().len()
    }

    /// Accepted publishes since creation.
    #[must_use]
    pub fn publish_count(&self) -> u64 {
        self.publish_count.load(Ordering::Relaxed)
    }

    /// Drop every subscription. The table is kept.
    pub fn shutdown(&self) -> usize {
        let removed = self.subscribers.write().clear();
        metrics::set_subscribers(0);
        tracing::info!(removed, "Market hub subscribers cleared");
        removed
    }
}

impl RatePublisher for MarketHub {
    fn publish(&self, rate: Rate) -> Result<PublishReport, ValidationError> {
        Self::publish(self, rate)
    }
}

/// Invoke one handler, containing any panic. Returns `false` on failure.
fn deliver(subscriber: &Subscriber, rate: &Rate) -> bool {
    match catch_unwind(AssertUnwindSafe(|| subscriber.on_rate_update(rate))) {
        Ok(()) => true,
        Err(payload) => {
            let error = SubscriberError::from_panic(subscriber.description(), payload.as_ref());
            tracing::error!(
                subscriber = %error.subscriber,
                instrument = %rate.instrument_key,
                error = %error,
                "Subscriber handler failed"
            );
            metrics::record_subscriber_failure();
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use mockall::predicate::function;
    use test_case::test_case;

    use super::*;
    use crate::application::ports::{FnSubscriber, MockRateSubscriber};

    fn rate(key: &str, bid: f64, ask: f64) -> Rate {
        Rate::from_quote(key, bid, ask, "TEST", Utc::now())
    }

    fn collector() -> (Subscriber, Arc<Mutex<Vec<Rate>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscriber: Subscriber = Arc::new(FnSubscriber::new("collector", move |r: &Rate| {
            sink.lock().push(r.clone());
        }));
        (subscriber, seen)
    }

    #[test]
    fn publish_stores_and_delivers() {
        let hub = MarketHub::new();
        let mut mock = MockRateSubscriber::new();
        mock.expect_description().return_const("mock".to_string());
        mock.expect_on_rate_update()
            .with(function(|r: &Rate| r.instrument_key == "EURUSD"))
            .times(1)
            .return_const(());
        hub.subscribe(Arc::new(mock), SubscriptionFilter::All);

        let report = hub.publish(rate("EURUSD", 1.0845, 1.0855)).unwrap();

        assert_eq!(report, PublishReport { delivered: 1, failed: 0 });
        assert!((hub.rate("EURUSD").unwrap().mid - 1.0850).abs() < 1e-12);
        assert_eq!(hub.publish_count(), 1);
    }

    #[test]
    fn crossed_book_is_rejected_without_side_effects() {
        let hub = MarketHub::new();
        let mut mock = MockRateSubscriber::new();
        mock.expect_description().return_const("mock".to_string());
        mock.expect_on_rate_update().never();
        hub.subscribe(Arc::new(mock), SubscriptionFilter::All);

        let err = hub.publish(rate("EURUSD", 1.0860, 1.0840)).unwrap_err();

        assert!(matches!(err, ValidationError::CrossedBook { .. }));
        assert!(hub.snapshot().is_empty());
        assert_eq!(hub.publish_count(), 0);
    }

    #[test_case("" ; "empty key")]
    #[test_case("   " ; "blank key")]
    fn empty_key_is_rejected(key: &str) {
        let hub = MarketHub::new();
        assert_eq!(
            hub.publish(rate(key, 1.0, 1.1)),
            Err(ValidationError::EmptyInstrumentKey)
        );
    }

    #[test]
    fn panicking_subscriber_does_not_stop_delivery() {
        let hub = MarketHub::new();
        let bad = Arc::new(FnSubscriber::new("bad", |_: &Rate| panic!("boom")));
        let (good, seen) = collector();
        hub.subscribe(bad, SubscriptionFilter::All);
        hub.subscribe(good, SubscriptionFilter::All);

        let report = hub.publish(rate("EURUSD", 1.0845, 1.0855)).unwrap();

        assert_eq!(report, PublishReport { delivered: 1, failed: 1 });
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn filtered_subscriber_only_sees_its_instruments() {
        let hub = MarketHub::new();
        let (sub, seen) = collector();
        hub.subscribe(sub, SubscriptionFilter::instruments(["GBPUSD"]));

        hub.publish(rate("EURUSD", 1.0845, 1.0855)).unwrap();
        hub.publish(rate("GBPUSD", 1.2645, 1.2655)).unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].instrument_key, "GBPUSD");
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let hub = MarketHub::new();
        let (a, seen_a) = collector();
        let (b, seen_b) = collector();
        let handle = hub.subscribe(a, SubscriptionFilter::All);
        hub.subscribe(b, SubscriptionFilter::All);

        assert!(hub.unsubscribe(handle));
        assert!(!hub.unsubscribe(handle));
        assert!(!hub.unsubscribe(SubscriptionHandle::from_id(999)));

        hub.publish(rate("EURUSD", 1.0845, 1.0855)).unwrap();
        assert!(seen_a.lock().is_empty());
        assert_eq!(seen_b.lock().len(), 1);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn subscribe_and_load_replays_matching_table() {
        let hub = MarketHub::new();
        hub.publish(rate("EURUSD", 1.0845, 1.0855)).unwrap();
        hub.publish(rate("GBPUSD", 1.2645, 1.2655)).unwrap();
        hub.publish(rate("USDJPY", 149.49, 149.51)).unwrap();

        let (sub, seen) = collector();
        hub.subscribe_and_load(sub, SubscriptionFilter::instruments(["EURUSD", "USDJPY"]));
        assert_eq!(seen.lock().len(), 2);

        hub.publish(rate("USDJPY", 149.50, 149.52)).unwrap();
        assert_eq!(seen.lock().len(), 3);
    }

    #[test]
    fn snapshot_is_frozen() {
        let hub = MarketHub::new();
        hub.publish(rate("EURUSD", 1.0845, 1.0855)).unwrap();
        let before = hub.snapshot();

        hub.publish(rate("EURUSD", 1.0895, 1.0905)).unwrap();
        hub.publish(rate("GBPUSD", 1.2645, 1.2655)).unwrap();

        assert_eq!(before.len(), 1);
        assert!((before.get("EURUSD").unwrap().mid - 1.0850).abs() < 1e-12);
        assert_eq!(hub.snapshot().len(), 2);
    }

    #[test]
    fn shutdown_clears_subscribers_keeps_table() {
        let hub = MarketHub::new();
        let (sub, seen) = collector();
        hub.subscribe(sub, SubscriptionFilter::All);
        hub.publish(rate("EURUSD", 1.0845, 1.0855)).unwrap();

        assert_eq!(hub.shutdown(), 1);
        hub.publish(rate("EURUSD", 1.0846, 1.0856)).unwrap();

        assert_eq!(seen.lock().len(), 1);
        assert_eq!(hub.instrument_count(), 1);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn stats_split_by_filter() {
        let hub = MarketHub::new();
        let (a, _) = collector();
        let (b, _) = collector();
        hub.subscribe(a, SubscriptionFilter::All);
        hub.subscribe(b, SubscriptionFilter::instruments(["EURUSD"]));

        let stats = hub.subscription_stats();
        assert_eq!(stats.subscriber_count, 2);
        assert_eq!(stats.all_instruments_count, 1);
        assert_eq!(stats.filtered_count, 1);
    }
}
