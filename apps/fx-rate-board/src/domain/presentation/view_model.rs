//! Per-instrument presentation state.
//!
//! # Highlight state machine
//!
//! ```text
//!            qualifying update                 step N
//!   Idle ─────────────────────────► Decaying ───────────► Idle
//!    ▲                              │    ▲
//!    │                              └────┘
//!    │                        qualifying update
//!    │                    (restart at 1.0, new generation)
//! ```
//!
//! Each restart bumps a generation counter. Decay steps carry the generation
//! they were scheduled for, so steps from a superseded timer are ignored.

use chrono::{DateTime, Utc};

use super::highlight::{DecayCurve, HighlightDirection, Rgba};
use super::notify::ChangeNotifier;
use crate::domain::rate::{InstrumentKey, Rate};

/// A displayed property that changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateProperty {
    /// Bid price.
    Bid,
    /// Ask price.
    Ask,
    /// Mid price.
    Mid,
    /// Ask minus bid.
    Spread,
    /// Producer tag.
    Source,
    /// Last update timestamp.
    LastUpdated,
    /// Liveness flag.
    IsActive,
    /// Highlight intensity or direction.
    Highlight,
}

/// Result of applying a decay step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecayProgress {
    /// The step belongs to a superseded or finished decay.
    Stale,
    /// Decay continues at this intensity.
    Running(f64),
    /// Intensity reached zero; the view-model is idle.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveDecay {
    generation: u64,
    step: u32,
    start_intensity: f64,
}

/// Presentation state for one instrument.
#[derive(Debug)]
pub struct RateViewModel {
    instrument_key: InstrumentKey,
    bid: f64,
    ask: f64,
    mid: f64,
    spread: f64,
    source: String,
    last_updated: DateTime<Utc>,
    is_active: bool,
    previous_mid: f64,
    highlight_intensity: f64,
    highlight_direction: HighlightDirection,
    curve: DecayCurve,
    generation: u64,
    decay: Option<ActiveDecay>,
    changes: ChangeNotifier<RateProperty>,
}

impl RateViewModel {
    /// Create a view-model initialised from its first rate. No pulse.
    #[must_use]
    pub fn from_rate(rate: &Rate, curve: DecayCurve) -> Self {
        Self {
            instrument_key: rate.instrument_key.clone(),
            bid: rate.bid,
            ask: rate.ask,
            mid: rate.mid,
            spread: rate.spread(),
            source: rate.source.clone(),
            last_updated: rate.last_updated,
            is_active: rate.is_active,
            previous_mid: 0.0,
            highlight_intensity: 0.0,
            highlight_direction: HighlightDirection::Flat,
            curve,
            generation: 0,
            decay: None,
            changes: ChangeNotifier::new(),
        }
    }

    /// Overwrite displayed fields from `rate` and restart the pulse.
    ///
    /// Returns the generation of the decay that was started, or `None` when
    /// the previous mid was zero (still initialising).
    pub fn update(&mut self, rate: &Rate) -> Option<u64> {
        let old_mid = self.mid;

        self.set_bid(rate.bid);
        self.set_ask(rate.ask);
        self.set_mid(rate.mid);
        self.set_spread(rate.spread());
        if self.source != rate.source {
            self.source.clone_from(&rate.source);
            self.changes.notify(&RateProperty::Source);
        }
        if self.last_updated != rate.last_updated {
            self.last_updated = rate.last_updated;
            self.changes.notify(&RateProperty::LastUpdated);
        }
        if self.is_active != rate.is_active {
            self.is_active = rate.is_active;
            self.changes.notify(&RateProperty::IsActive);
        }

        if old_mid == 0.0 {
            return None;
        }

        self.previous_mid = old_mid;
        Some(self.start_decay(HighlightDirection::from_move(old_mid, rate.mid)))
    }

    /// Cancel any in-flight decay and start a fresh one at full intensity.
    fn start_decay(&mut self, direction: HighlightDirection) -> u64 {
        self.generation += 1;
        self.decay = Some(ActiveDecay {
            generation: self.generation,
            step: 0,
            start_intensity: 1.0,
        });
        self.highlight_direction = direction;
        self.highlight_intensity = 1.0;
        self.changes.notify(&RateProperty::Highlight);
        self.generation
    }

    /// Apply decay step `step` (1-indexed) of decay `generation`.
    pub fn advance_decay(&mut self, generation: u64, step: u32) -> DecayProgress {
        let Some(decay) = self.decay.as_mut() else {
            return DecayProgress::Stale;
        };

        if decay.generation != generation || step <= decay.step {
            return DecayProgress::Stale;
        }

        decay.step = step;

        if step >= self.curve.steps() {
            self.decay = None;
            self.highlight_intensity = 0.0;
            self.changes.notify(&RateProperty::Highlight);
            return DecayProgress::Finished;
        }

        let intensity = self.curve.intensity_at(decay.start_intensity, step);
        self.highlight_intensity = intensity;
        self.changes.notify(&RateProperty::Highlight);
        DecayProgress::Running(intensity)
    }

    fn set_bid(&mut self, value: f64) {
        if self.bid != value {
            self.bid = value;
            self.changes.notify(&RateProperty::Bid);
        }
    }

    fn set_ask(&mut self, value: f64) {
        if self.ask != value {
            self.ask = value;
            self.changes.notify(&RateProperty::Ask);
        }
    }

    fn set_mid(&mut self, value: f64) {
        if self.mid != value {
            self.mid = value;
            self.changes.notify(&RateProperty::Mid);
        }
    }

    fn set_spread(&mut self, value: f64) {
        if self.spread != value {
            self.spread = value;
            self.changes.notify(&RateProperty::Spread);
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Instrument key.
    #[must_use]
    pub fn instrument_key(&self) -> &str {
        &self.instrument_key
    }

    /// Displayed bid.
    #[must_use]
    pub const fn bid(&self) -> f64 {
        self.bid
    }

    /// Displayed ask.
    #[must_use]
    pub const fn ask(&self) -> f64 {
        self.ask
    }

    /// Displayed mid.
    #[must_use]
    pub const fn mid(&self) -> f64 {
        self.mid
    }

    /// Displayed spread.
    #[must_use]
    pub const fn spread(&self) -> f64 {
        self.spread
    }

    /// Producer tag.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Last update timestamp.
    #[must_use]
    pub const fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Liveness flag.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_active
    }

    /// Mid before the last pulse-triggering update.
    #[must_use]
    pub const fn previous_mid(&self) -> f64 {
        self.previous_mid
    }

    /// Current highlight intensity in `0.0..=1.0`.
    #[must_use]
    pub const fn highlight_intensity(&self) -> f64 {
        self.highlight_intensity
    }

    /// Direction of the last pulse.
    #[must_use]
    pub const fn highlight_direction(&self) -> HighlightDirection {
        self.highlight_direction
    }

    /// Whether a decay is in progress.
    #[must_use]
    pub const fn is_decaying(&self) -> bool {
        self.decay.is_some()
    }

    /// Generation of the most recent decay.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Background colour for the current highlight.
    #[must_use]
    pub fn highlight_colour(&self) -> Rgba {
        if self.highlight_intensity <= 0.0 {
            return Rgba::TRANSPARENT;
        }
        self.highlight_direction
            .base_colour()
            .faded(self.highlight_intensity)
    }

    /// Time since the last update. Derived on demand, never stored.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_updated
    }

    /// Text such as `2.4s ago`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn last_updated_display(&self, now: DateTime<Utc>) -> String {
        let seconds = self.age(now).num_milliseconds() as f64 / 1000.0;
        format!("{seconds:.1}s ago")
    }

    /// Property change listeners.
    pub fn changes_mut(&mut self) -> &mut ChangeNotifier<RateProperty> {
        &mut self.changes
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;

    fn rate(key: &str, mid: f64) -> Rate {
        Rate::from_quote(key, mid - 0.0005, mid + 0.0005, "TEST", Utc::now())
    }

    fn curve() -> DecayCurve {
        DecayCurve::new(50, Duration::from_millis(500))
    }

    #[test]
    fn first_load_never_pulses() {
        let vm = RateViewModel::from_rate(&rate("EURUSD", 1.0850), curve());

        assert_eq!(vm.highlight_intensity(), 0.0);
        assert!(!vm.is_decaying());
        assert_eq!(vm.highlight_colour(), Rgba::TRANSPARENT);
    }

    #[test]
    fn update_up_starts_full_intensity_pulse() {
        let mut vm = RateViewModel::from_rate(&rate("EURUSD", 1.0850), curve());
        let generation = vm.update(&rate("EURUSD", 1.0900));

        assert_eq!(generation, Some(1));
        assert_eq!(vm.highlight_direction(), HighlightDirection::Up);
        assert_eq!(vm.highlight_intensity(), 1.0);
        assert!((vm.previous_mid() - 1.0850).abs() < 1e-12);
        assert!((vm.mid() - 1.0900).abs() < 1e-12);
    }

    #[test]
    fn update_down_sets_down_direction() {
        let mut vm = RateViewModel::from_rate(&rate("EURUSD", 1.0900), curve());
        vm.update(&rate("EURUSD", 1.0850));
        assert_eq!(vm.highlight_direction(), HighlightDirection::Down);
    }

    #[test]
    fn unchanged_mid_pulses_flat() {
        let mut vm = RateViewModel::from_rate(&rate("EURUSD", 1.0850), curve());
        assert!(vm.update(&rate("EURUSD", 1.0850)).is_some());
        assert_eq!(vm.highlight_direction(), HighlightDirection::Flat);
    }

    #[test]
    fn zero_mid_skips_pulse() {
        let mut initial = rate("EURUSD", 0.0);
        initial.bid = 0.0;
        initial.ask = 0.0;
        let mut vm = RateViewModel::from_rate(&initial, curve());

        assert!(vm.update(&rate("EURUSD", 1.0850)).is_none());
        assert_eq!(vm.highlight_intensity(), 0.0);
        assert!((vm.mid() - 1.0850).abs() < 1e-12);
    }

    #[test]
    fn decay_runs_to_exactly_zero_monotonically() {
        let mut vm = RateViewModel::from_rate(&rate("EURUSD", 1.0850), curve());
        let generation = vm.update(&rate("EURUSD", 1.0900)).unwrap();

        let mut previous = vm.highlight_intensity();
        for step in 1..50 {
            match vm.advance_decay(generation, step) {
                DecayProgress::Running(value) => {
                    assert!(value <= previous, "step {step}: {value} > {previous}");
                    previous = value;
                }
                other => panic!("unexpected {other:?} at step {step}"),
            }
        }

        assert_eq!(vm.advance_decay(generation, 50), DecayProgress::Finished);
        assert_eq!(vm.highlight_intensity(), 0.0);
        assert!(!vm.is_decaying());
    }

    #[test]
    fn restart_mid_decay_resets_to_full_intensity() {
        let mut vm = RateViewModel::from_rate(&rate("EURUSD", 1.0850), curve());
        let first = vm.update(&rate("EURUSD", 1.0900)).unwrap();

        for step in 1..=30 {
            vm.advance_decay(first, step);
        }
        assert!(vm.highlight_intensity() < 1.0);

        let second = vm.update(&rate("EURUSD", 1.0880)).unwrap();

        assert_ne!(first, second);
        assert_eq!(vm.generation(), second);
        assert_eq!(vm.highlight_intensity(), 1.0);
        assert_eq!(vm.highlight_direction(), HighlightDirection::Down);

        // Steps from the superseded decay are ignored.
        assert_eq!(vm.advance_decay(first, 31), DecayProgress::Stale);
        assert_eq!(vm.highlight_intensity(), 1.0);

        // The new decay starts from step one.
        assert!(matches!(
            vm.advance_decay(second, 1),
            DecayProgress::Running(v) if v < 1.0
        ));
    }

    #[test]
    fn duplicate_or_idle_steps_are_stale() {
        let mut vm = RateViewModel::from_rate(&rate("EURUSD", 1.0850), curve());
        assert_eq!(vm.advance_decay(0, 1), DecayProgress::Stale);

        let generation = vm.update(&rate("EURUSD", 1.0900)).unwrap();
        assert!(matches!(vm.advance_decay(generation, 2), DecayProgress::Running(_)));
        assert_eq!(vm.advance_decay(generation, 2), DecayProgress::Stale);
        assert_eq!(vm.advance_decay(generation, 1), DecayProgress::Stale);
    }

    #[test]
    fn property_changes_are_notified() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut vm = RateViewModel::from_rate(&rate("EURUSD", 1.0850), curve());

        let sink = Arc::clone(&seen);
        vm.changes_mut().subscribe(move |p| sink.lock().push(*p));
        vm.update(&rate("EURUSD", 1.0900));

        let seen = seen.lock();
        assert!(seen.contains(&RateProperty::Bid));
        assert!(seen.contains(&RateProperty::Mid));
        assert!(seen.contains(&RateProperty::Highlight));
        assert!(!seen.contains(&RateProperty::Source));
    }

    #[test]
    fn last_updated_display_is_derived() {
        let r = rate("EURUSD", 1.0850);
        let vm = RateViewModel::from_rate(&r, curve());
        let now = r.last_updated + chrono::Duration::milliseconds(2_400);

        assert_eq!(vm.last_updated_display(now), "2.4s ago");
        assert_eq!(vm.age(now), chrono::Duration::milliseconds(2_400));
    }

    #[test]
    fn highlight_colour_fades_with_intensity() {
        let mut vm = RateViewModel::from_rate(&rate("EURUSD", 1.0850), curve());
        let generation = vm.update(&rate("EURUSD", 1.0900)).unwrap();
        assert_eq!(vm.highlight_colour().a, 180);

        vm.advance_decay(generation, 25);
        assert!(vm.highlight_colour().a < 180);
        assert_eq!(vm.highlight_colour().g, 255);
    }
}
