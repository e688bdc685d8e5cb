//! Board Configuration Settings
//!
//! Configuration types for the rate board, loaded from `FX_BOARD_*`
//! environment variables. Values that do not parse fall back to their
//! defaults. Values that parse but are out of range are errors.

use std::time::Duration;

use crate::application::services::{DEFAULT_SOURCE, DEFAULT_UPDATED_BY, GeneratorConfig};
use crate::domain::presentation::DecayCurve;

const PREFIX: &str = "FX_BOARD_";

/// Time-ago text must refresh at least this often.
const MAX_STATUS_INTERVAL: Duration = Duration::from_secs(1);

/// Simulated feed settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorSettings {
    /// Time between generator ticks.
    pub tick_interval: Duration,
    /// Share of the universe re-quoted per tick.
    pub update_fraction: f64,
    /// Deterministic RNG seed.
    pub seed: Option<u64>,
    /// `Rate::source` tag.
    pub source: String,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(250),
            update_fraction: 0.2,
            seed: None,
            source: DEFAULT_SOURCE.to_string(),
        }
    }
}

impl GeneratorSettings {
    /// Generator configuration for these settings.
    #[must_use]
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            interval: self.tick_interval,
            update_fraction: self.update_fraction,
            source: self.source.clone(),
            updated_by: DEFAULT_UPDATED_BY.to_string(),
            seed: self.seed,
        }
    }
}

/// Highlight pulse settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseSettings {
    /// Decay steps `N`.
    pub steps: u32,
    /// Decay duration `T`.
    pub duration: Duration,
}

impl Default for PulseSettings {
    fn default() -> Self {
        Self {
            steps: 50,
            duration: Duration::from_millis(500),
        }
    }
}

impl PulseSettings {
    /// Decay curve for these settings.
    #[must_use]
    pub fn curve(&self) -> DecayCurve {
        DecayCurve::new(self.steps, self.duration)
    }
}

/// UI context settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiSettings {
    /// Status line and time-ago refresh period.
    pub status_interval: Duration,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            status_interval: Duration::from_secs(1),
        }
    }
}

/// Background snapshot monitor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Time between snapshot logs.
    pub interval: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
        }
    }
}

/// Shutdown settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownSettings {
    /// How long each producer gets to stop.
    pub grace: Duration,
}

impl Default for ShutdownSettings {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(5),
        }
    }
}

/// Complete board configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardConfig {
    /// Simulated feed.
    pub generator: GeneratorSettings,
    /// Highlight pulse.
    pub pulse: PulseSettings,
    /// UI context.
    pub ui: UiSettings,
    /// Snapshot monitor.
    pub monitor: MonitorSettings,
    /// Shutdown.
    pub shutdown: ShutdownSettings,
}

impl BoardConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is outside its allowed range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is outside its allowed range.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };
        let defaults = Self::default();

        let generator = GeneratorSettings {
            tick_interval: env.duration_millis("TICK_INTERVAL_MS", defaults.generator.tick_interval),
            update_fraction: env.f64("UPDATE_FRACTION", defaults.generator.update_fraction),
            seed: env.parsed::<u64>("SEED"),
            source: env
                .string("SOURCE")
                .unwrap_or(defaults.generator.source),
        };

        let pulse = PulseSettings {
            steps: env.u32("PULSE_STEPS", defaults.pulse.steps),
            duration: env.duration_millis("PULSE_DURATION_MS", defaults.pulse.duration),
        };

        let ui = UiSettings {
            status_interval: env.duration_millis("STATUS_INTERVAL_MS", defaults.ui.status_interval),
        };

        let monitor = MonitorSettings {
            interval: env.duration_secs("MONITOR_INTERVAL_SECS", defaults.monitor.interval),
        };

        let shutdown = ShutdownSettings {
            grace: env.duration_millis("SHUTDOWN_GRACE_MS", defaults.shutdown.grace),
        };

        let config = Self {
            generator,
            pulse,
            ui,
            monitor,
            shutdown,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let fraction = self.generator.update_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(ConfigError::invalid(
                "UPDATE_FRACTION",
                fraction,
                "must be in (0, 1]",
            ));
        }

        if self.pulse.steps == 0 {
            return Err(ConfigError::invalid("PULSE_STEPS", 0, "must be at least 1"));
        }

        if self.generator.tick_interval.is_zero() {
            return Err(ConfigError::invalid("TICK_INTERVAL_MS", 0, "must be positive"));
        }

        if self.ui.status_interval.is_zero() {
            return Err(ConfigError::invalid("STATUS_INTERVAL_MS", 0, "must be positive"));
        }

        if self.ui.status_interval > MAX_STATUS_INTERVAL {
            return Err(ConfigError::invalid(
                "STATUS_INTERVAL_MS",
                self.ui.status_interval.as_millis(),
                "must be at most 1000",
            ));
        }

        if self.monitor.interval.is_zero() {
            return Err(ConfigError::invalid(
                "MONITOR_INTERVAL_SECS",
                0,
                "must be positive",
            ));
        }

        if self.generator.source.trim().is_empty() {
            return Err(ConfigError::invalid("SOURCE", "", "cannot be empty"));
        }

        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A variable parsed but is outside its allowed range.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        /// Full variable name.
        key: String,
        /// Offending value.
        value: String,
        /// Constraint that was violated.
        reason: &'static str,
    },
}

impl ConfigError {
    fn invalid(suffix: &str, value: impl ToString, reason: &'static str) -> Self {
        Self::InvalidValue {
            key: format!("{PREFIX}{suffix}"),
            value: value.to_string(),
            reason,
        }
    }
}

// =============================================================================
// Variable Parsing
// =============================================================================

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, suffix: &str) -> Option<String> {
        (self.lookup)(&format!("{PREFIX}{suffix}"))
    }

    fn parsed<T: std::str::FromStr>(&self, suffix: &str) -> Option<T> {
        self.string(suffix).and_then(|v| v.trim().parse().ok())
    }

    fn u32(&self, suffix: &str, default: u32) -> u32 {
        self.parsed(suffix).unwrap_or(default)
    }

    fn f64(&self, suffix: &str, default: f64) -> f64 {
        self.parsed(suffix).unwrap_or(default)
    }

    fn duration_secs(&self, suffix: &str, default: Duration) -> Duration {
        self.parsed::<u64>(suffix)
            .map_or(default, Duration::from_secs)
    }

    fn duration_millis(&self, suffix: &str, default: Duration) -> Duration {
        self.parsed::<u64>(suffix)
            .map_or(default, Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use test_case::test_case;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<BoardConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        BoardConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, BoardConfig::default());
        assert_eq!(config.generator.tick_interval, Duration::from_millis(250));
        assert_eq!(config.pulse.curve(), DecayCurve::default());
        assert_eq!(config.shutdown.grace, Duration::from_secs(5));
        assert_eq!(config.monitor.interval, Duration::from_secs(10));
        assert_eq!(config.generator.source, "MARKET_SIMULATOR");
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("FX_BOARD_TICK_INTERVAL_MS", "100"),
            ("FX_BOARD_UPDATE_FRACTION", "0.5"),
            ("FX_BOARD_SEED", "42"),
            ("FX_BOARD_SOURCE", "REPLAY"),
            ("FX_BOARD_PULSE_STEPS", "20"),
            ("FX_BOARD_PULSE_DURATION_MS", "200"),
            ("FX_BOARD_STATUS_INTERVAL_MS", "500"),
            ("FX_BOARD_MONITOR_INTERVAL_SECS", "30"),
            ("FX_BOARD_SHUTDOWN_GRACE_MS", "1000"),
        ])
        .unwrap();

        assert_eq!(config.generator.tick_interval, Duration::from_millis(100));
        assert!((config.generator.update_fraction - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.generator.seed, Some(42));
        assert_eq!(config.generator.source, "REPLAY");
        assert_eq!(config.pulse.steps, 20);
        assert_eq!(config.pulse.curve().step_interval(), Duration::from_millis(10));
        assert_eq!(config.ui.status_interval, Duration::from_millis(500));
        assert_eq!(config.monitor.interval, Duration::from_secs(30));
        assert_eq!(config.shutdown.grace, Duration::from_secs(1));

        let generator = config.generator.generator_config();
        assert_eq!(generator.seed, Some(42));
        assert_eq!(generator.updated_by, "MarketDataUpdater");
    }

    #[test]
    fn unparsable_values_fall_back() {
        let config = load(&[
            ("FX_BOARD_TICK_INTERVAL_MS", "fast"),
            ("FX_BOARD_PULSE_STEPS", "-3"),
            ("FX_BOARD_SEED", "random"),
        ])
        .unwrap();

        assert_eq!(config.generator.tick_interval, Duration::from_millis(250));
        assert_eq!(config.pulse.steps, 50);
        assert_eq!(config.generator.seed, None);
    }

    #[test_case("FX_BOARD_UPDATE_FRACTION", "0" ; "zero fraction")]
    #[test_case("FX_BOARD_UPDATE_FRACTION", "1.5" ; "fraction above one")]
    #[test_case("FX_BOARD_PULSE_STEPS", "0" ; "zero steps")]
    #[test_case("FX_BOARD_TICK_INTERVAL_MS", "0" ; "zero tick")]
    #[test_case("FX_BOARD_STATUS_INTERVAL_MS", "0" ; "zero status")]
    #[test_case("FX_BOARD_STATUS_INTERVAL_MS", "1500" ; "status slower than a second")]
    #[test_case("FX_BOARD_MONITOR_INTERVAL_SECS", "0" ; "zero monitor")]
    #[test_case("FX_BOARD_SOURCE", "  " ; "blank source")]
    fn out_of_range_values_are_rejected(key: &str, value: &str) {
        let err = load(&[(key, value)]).unwrap_err();
        let ConfigError::InvalidValue { key: reported, .. } = err;
        assert_eq!(reported, key);
    }
}
