//! Periodic log of the hub table size.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::MarketHub;
use crate::application::services::TaskHandle;

/// Logs a snapshot summary on a fixed interval.
#[derive(Debug)]
pub struct SnapshotMonitor {
    hub: Arc<MarketHub>,
    interval: Duration,
}

impl SnapshotMonitor {
    /// Create a monitor for `hub`.
    #[must_use]
    pub const fn new(hub: Arc<MarketHub>, interval: Duration) -> Self {
        Self { hub, interval }
    }

    /// Take one snapshot and log it. Returns the instrument count.
    pub fn check(&self) -> usize {
        let snapshot = self.hub.snapshot();
        tracing::info!(
            instruments = snapshot.len(),
            subscribers = self.hub.subscriber_count(),
            publishes = self.hub.publish_count(),
            "Market snapshot"
        );
        snapshot.len()
    }

    /// Check on every interval until cancelled. The first check runs after
    /// one full interval.
    pub async fn run(self, cancel: CancellationToken) {
        let start = tokio::time::Instant::now() + self.interval;
        let mut interval = tokio::time::interval_at(start, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!("Snapshot monitor cancelled");
                    break;
                }
                _ = interval.tick() => {
                    self.check();
                }
            }
        }
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    #[must_use]
    pub fn spawn(self, cancel: CancellationToken) -> TaskHandle {
        let token = cancel.clone();
        let task = tokio::spawn(self.run(token));
        TaskHandle::new("snapshot_monitor", cancel, task)
    }
}
