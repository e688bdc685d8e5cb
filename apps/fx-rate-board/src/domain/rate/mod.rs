//! FX Rate Types
//!
//! The value type handed between producers, the hub and the UI, plus the
//! plain latest-value table keyed by instrument.
//!
//! A [`Rate`] is copied at every hand-off. Nothing holds a mutable reference
//! to a rate that another thread can observe.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Types
// =============================================================================

/// Instrument identifier, unique per instrument (e.g. `EURUSD`).
pub type InstrumentKey = String;

/// A two-sided FX rate for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    /// Instrument this rate belongs to.
    pub instrument_key: InstrumentKey,
    /// Bid price.
    pub bid: f64,
    /// Ask price.
    pub ask: f64,
    /// Midpoint price.
    pub mid: f64,
    /// Tag identifying the producer.
    pub source: String,
    /// Time the price was observed.
    pub as_of: DateTime<Utc>,
    /// Time the record was last written.
    pub last_updated: DateTime<Utc>,
    /// Component that last wrote the record.
    pub last_updated_by: String,
    /// Liveness flag.
    pub is_active: bool,
}

impl Rate {
    /// Build an active rate from a bid/ask pair, deriving the midpoint.
    #[must_use]
    pub fn from_quote(
        instrument_key: impl Into<InstrumentKey>,
        bid: f64,
        ask: f64,
        source: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            instrument_key: instrument_key.into(),
            bid,
            ask,
            mid: f64::midpoint(bid, ask),
            source: source.into(),
            as_of: now,
            last_updated: now,
            last_updated_by: String::new(),
            is_active: true,
        }
    }

    /// Set the `last_updated_by` audit tag.
    #[must_use]
    pub fn with_updated_by(mut self, updated_by: impl Into<String>) -> Self {
        self.last_updated_by = updated_by.into();
        self
    }

    /// Ask minus bid.
    #[must_use]
    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }

    /// Check the rate can be published.
    ///
    /// Requires a non-empty key, finite prices and `bid <= mid <= ask`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.instrument_key.trim().is_empty() {
            return Err(ValidationError::EmptyInstrumentKey);
        }

        if !(self.bid.is_finite() && self.ask.is_finite() && self.mid.is_finite()) {
            return Err(ValidationError::NonFinitePrice {
                key: self.instrument_key.clone(),
            });
        }

        if self.bid > self.ask {
            return Err(ValidationError::CrossedBook {
                key: self.instrument_key.clone(),
                bid: self.bid,
                ask: self.ask,
            });
        }

        if self.mid < self.bid || self.mid > self.ask {
            return Err(ValidationError::MidOutsideBook {
                key: self.instrument_key.clone(),
                bid: self.bid,
                mid: self.mid,
                ask: self.ask,
            });
        }

        Ok(())
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// A rate that cannot be published.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// The instrument key is empty or whitespace.
    #[error("rate has an empty instrument key")]
    EmptyInstrumentKey,
    /// A price is NaN or infinite.
    #[error("rate for {key} has a non-finite price")]
    NonFinitePrice {
        /// Instrument key.
        key: InstrumentKey,
    },
    /// Bid is above ask.
    #[error("crossed book for {key}: bid {bid} > ask {ask}")]
    CrossedBook {
        /// Instrument key.
        key: InstrumentKey,
        /// Offending bid.
        bid: f64,
        /// Offending ask.
        ask: f64,
    },
    /// Mid lies outside `[bid, ask]`.
    #[error("mid {mid} for {key} is outside book [{bid}, {ask}]")]
    MidOutsideBook {
        /// Instrument key.
        key: InstrumentKey,
        /// Bid.
        bid: f64,
        /// Offending mid.
        mid: f64,
        /// Ask.
        ask: f64,
    },
}

impl ValidationError {
    /// Short label for metrics.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::EmptyInstrumentKey => "empty_key",
            Self::NonFinitePrice { .. } => "non_finite",
            Self::CrossedBook { .. } => "crossed_book",
            Self::MidOutsideBook { .. } => "mid_outside_book",
        }
    }
}

// =============================================================================
// Rate Store
// =============================================================================

/// Latest known rate per instrument. Pure data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateStore {
    rates: HashMap<InstrumentKey, Rate>,
}

impl RateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored rate for the rate's instrument.
    ///
    /// Returns the rate previously stored for that instrument.
    pub fn upsert(&mut self, rate: Rate) -> Option<Rate> {
        self.rates.insert(rate.instrument_key.clone(), rate)
    }

    /// Latest rate for an instrument.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Rate> {
        self.rates.get(key)
    }

    /// Whether the instrument has a stored rate.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.rates.contains_key(key)
    }

    /// Number of instruments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Iterate over all stored rates (arbitrary order).
    pub fn iter(&self) -> impl Iterator<Item = (&InstrumentKey, &Rate)> {
        self.rates.iter()
    }

    /// Copy out the full table.
    #[must_use]
    pub fn to_map(&self) -> HashMap<InstrumentKey, Rate> {
        self.rates.clone()
    }
}

// =============================================================================
// Tests
// =============================================================================
