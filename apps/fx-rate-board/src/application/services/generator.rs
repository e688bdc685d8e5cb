//! Simulated Rate Generator
//!
//! Stand-in for a real feed. On every tick a random subset of the instrument
//! universe is re-quoted around its base price and published.
//!
//! # Quote model
//!
//! ```text
//! mid'   = base * (1 + U(-0.005, 0.005))
//! spread = base * U(0.001, 0.003)
//! bid    = mid' - spread / 2
//! ask    = mid' + spread / 2
//! mid    = (bid + ask) / 2
//! ```
//!
//! Quotes are built from the fixed base, not the last published value, so
//! prices wander around the base rather than random-walking away from it.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::lifecycle::TaskHandle;
use crate::application::ports::RatePublisher;
use crate::domain::rate::{InstrumentKey, Rate};
use crate::domain::subscription::panic_message;

/// Default `Rate::source` tag for simulated rates.
pub const DEFAULT_SOURCE: &str = "MARKET_SIMULATOR";

/// Default `Rate::last_updated_by` tag for simulated rates.
pub const DEFAULT_UPDATED_BY: &str = "MarketDataUpdater";

/// Maximum relative move of the mid away from base per quote.
const MAX_VARIATION: f64 = 0.005;

/// Relative spread bounds.
const SPREAD_RANGE: std::ops::Range<f64> = 0.001..0.003;

// =============================================================================
// Universe
// =============================================================================

/// An instrument the generator quotes.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    /// Instrument key.
    pub key: InstrumentKey,
    /// Base price quotes are generated around.
    pub base: f64,
}

impl Instrument {
    /// Build an instrument.
    #[must_use]
    pub fn new(key: impl Into<InstrumentKey>, base: f64) -> Self {
        Self {
            key: key.into(),
            base,
        }
    }
}

/// The ten major pairs with their base prices.
#[must_use]
pub fn default_universe() -> Vec<Instrument> {
    [
        ("EURUSD", 1.0850),
        ("GBPUSD", 1.2650),
        ("USDJPY", 149.50),
        ("USDCHF", 0.8750),
        ("USDCAD", 1.3450),
        ("AUDUSD", 0.6550),
        ("NZDUSD", 0.6150),
        ("EURGBP", 0.8580),
        ("EURJPY", 162.20),
        ("GBPJPY", 189.10),
    ]
    .into_iter()
    .map(|(key, base)| Instrument::new(key, base))
    .collect()
}

// =============================================================================
// Configuration
// =============================================================================

/// Generator settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Time between ticks.
    pub interval: Duration,
    /// Share of the universe re-quoted per tick, in `(0, 1]`.
    pub update_fraction: f64,
    /// `Rate::source` tag.
    pub source: String,
    /// `Rate::last_updated_by` tag.
    pub updated_by: String,
    /// RNG seed. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(250),
            update_fraction: 0.2,
            source: DEFAULT_SOURCE.to_string(),
            updated_by: DEFAULT_UPDATED_BY.to_string(),
            seed: None,
        }
    }
}

/// Number of instruments picked per tick: `ceil(len * fraction)`, at least 1
/// and at most `len`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn selection_size(len: usize, fraction: f64) -> usize {
    if len == 0 {
        return 0;
    }
    let wanted = (len as f64 * fraction).ceil() as usize;
    wanted.clamp(1, len)
}

/// Build a quote for `instrument` from a relative mid move and relative spread.
#[must_use]
pub fn quote(
    instrument: &Instrument,
    variation: f64,
    spread_fraction: f64,
    now: DateTime<Utc>,
    source: &str,
    updated_by: &str,
) -> Rate {
    let target_mid = instrument.base * (1.0 + variation);
    let half_spread = instrument.base * spread_fraction / 2.0;

    Rate::from_quote(
        instrument.key.clone(),
        target_mid - half_spread,
        target_mid + half_spread,
        source,
        now,
    )
    .with_updated_by(updated_by)
}

/// Counts from one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Rates accepted by the publisher.
    pub published: usize,
    /// Rates the publisher rejected.
    pub rejected: usize,
    /// Publishes that panicked.
    pub failed: usize,
    /// The tick stopped early on cancellation.
    pub cancelled: bool,
}

// =============================================================================
// Generator
// =============================================================================

/// Periodically publishes simulated rates.
pub struct RateGenerator {
    publisher: Arc<dyn RatePublisher>,
    universe: Vec<Instrument>,
    config: GeneratorConfig,
    rng: StdRng,
}

impl std::fmt::Debug for RateGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGenerator")
            .field("universe", &self.universe.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RateGenerator {
    /// Create a generator publishing into `publisher`.
    #[must_use]
    pub fn new(
        publisher: Arc<dyn RatePublisher>,
        universe: Vec<Instrument>,
        config: GeneratorConfig,
    ) -> Self {
        let rng = config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

        Self {
            publisher,
            universe,
            config,
            rng,
        }
    }

    /// Instruments this generator quotes.
    #[must_use]
    pub fn universe(&self) -> &[Instrument] {
        &self.universe
    }

    /// Re-quote and publish a random subset of the universe once.
    ///
    /// The token is checked before each publish, so a cancelled tick stops
    /// between whole rates and never leaves one half-applied.
    pub fn tick(&mut self, cancel: &CancellationToken) -> TickSummary {
        let mut summary = TickSummary::default();
        let amount = selection_size(self.universe.len(), self.config.update_fraction);
        let picked = rand::seq::index::sample(&mut self.rng, self.universe.len(), amount);
        let now = Utc::now();

        for index in picked {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let instrument = &self.universe[index];
            let variation = self.rng.random_range(-MAX_VARIATION..MAX_VARIATION);
            let spread = self.rng.random_range(SPREAD_RANGE);
            let rate = quote(
                instrument,
                variation,
                spread,
                now,
                &self.config.source,
                &self.config.updated_by,
            );

            let publisher = &self.publisher;
            match catch_unwind(AssertUnwindSafe(|| publisher.publish(rate))) {
                Ok(Ok(_)) => summary.published += 1,
                Ok(Err(e)) => {
                    summary.rejected += 1;
                    tracing::warn!(instrument = %instrument.key, error = %e, "Generated rate rejected");
                }
                Err(payload) => {
                    summary.failed += 1;
                    tracing::error!(
                        instrument = %instrument.key,
                        error = %panic_message(payload.as_ref()),
                        "Publishing generated rate failed"
                    );
                }
            }
        }

        summary
    }

    /// Tick on the configured interval until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            instruments = self.universe.len(),
            interval_ms = self.config.interval.as_millis(),
            update_fraction = self.config.update_fraction,
            "Rate generator started"
        );

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!("Rate generator cancelled");
                    break;
                }
                _ = interval.tick() => {
                    let summary = self.tick(&cancel);
                    tracing::trace!(
                        published = summary.published,
                        rejected = summary.rejected,
                        failed = summary.failed,
                        "Generator tick"
                    );
                }
            }
        }

        tracing::info!("Rate generator stopped");
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    #[must_use]
    pub fn spawn(self, cancel: CancellationToken) -> TaskHandle {
        let token = cancel.clone();
        let task = tokio::spawn(self.run(token));
        TaskHandle::new("rate_generator", cancel, task)
    }
}
