//! Ordered collection of rate view-models plus the status line.

use std::collections::HashMap;
use std::fmt::Display;

use chrono::{DateTime, TimeZone};

use super::highlight::{DecayCurve, HighlightDirection};
use super::notify::ChangeNotifier;
use super::view_model::{DecayProgress, RateViewModel};
use crate::domain::rate::{InstrumentKey, Rate};

/// Status text before the first refresh.
pub const INITIAL_STATUS: &str = "Initializing...";

/// A change to the list that renderers should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListChange {
    /// A row was appended for a previously unseen instrument.
    RowAdded {
        /// Row position.
        index: usize,
        /// Instrument key.
        key: InstrumentKey,
    },
    /// An existing row's fields were overwritten.
    RowUpdated {
        /// Row position.
        index: usize,
        /// Instrument key.
        key: InstrumentKey,
    },
    /// A row started a new pulse.
    PulseStarted {
        /// Row position.
        index: usize,
        /// Move direction.
        direction: HighlightDirection,
    },
    /// A row's highlight intensity changed.
    HighlightChanged {
        /// Row position.
        index: usize,
    },
    /// Derived "time ago" text should be re-read for a row.
    TimeAgoRefreshed {
        /// Row position.
        index: usize,
    },
    /// The status line changed.
    StatusText,
}

/// What [`RateListViewModel::apply`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A new row was created. No pulse.
    Added {
        /// Row position.
        index: usize,
    },
    /// An existing row was updated.
    Updated {
        /// Row position.
        index: usize,
        /// Generation of the decay that was started, if any.
        pulse: Option<u64>,
    },
}

/// Rows in first-seen order, at most one per instrument.
#[derive(Debug)]
pub struct RateListViewModel {
    rows: Vec<RateViewModel>,
    index: HashMap<InstrumentKey, usize>,
    curve: DecayCurve,
    status_text: String,
    update_count: u64,
    changes: ChangeNotifier<ListChange>,
}

impl RateListViewModel {
    /// Create an empty list whose rows decay along `curve`.
    #[must_use]
    pub fn new(curve: DecayCurve) -> Self {
        Self {
            rows: Vec::new(),
            index: HashMap::new(),
            curve,
            status_text: INITIAL_STATUS.to_string(),
            update_count: 0,
            changes: ChangeNotifier::new(),
        }
    }

    /// Find-or-create the row for the rate's instrument and update it.
    pub fn apply(&mut self, rate: &Rate) -> ApplyOutcome {
        self.update_count += 1;

        let outcome = if let Some(&index) = self.index.get(&rate.instrument_key) {
            let pulse = self.rows[index].update(rate);
            self.changes.notify(&ListChange::RowUpdated {
                index,
                key: rate.instrument_key.clone(),
            });
            if pulse.is_some() {
                let direction = self.rows[index].highlight_direction();
                self.changes
                    .notify(&ListChange::PulseStarted { index, direction });
            }
            ApplyOutcome::Updated { index, pulse }
        } else {
            let index = self.rows.len();
            self.rows.push(RateViewModel::from_rate(rate, self.curve));
            self.index.insert(rate.instrument_key.clone(), index);
            self.changes.notify(&ListChange::RowAdded {
                index,
                key: rate.instrument_key.clone(),
            });
            ApplyOutcome::Added { index }
        };

        self.refresh_time_ago();
        outcome
    }

    /// Forward a decay step to the row for `key`.
    pub fn advance_decay(&mut self, key: &str, generation: u64, step: u32) -> DecayProgress {
        let Some(&index) = self.index.get(key) else {
            return DecayProgress::Stale;
        };

        let progress = self.rows[index].advance_decay(generation, step);
        if progress != DecayProgress::Stale {
            self.changes.notify(&ListChange::HighlightChanged { index });
        }
        progress
    }

    /// Recompute the status line and ask renderers to refresh every row's
    /// derived "time ago" text.
    pub fn refresh_status<Tz>(&mut self, now: &DateTime<Tz>)
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        self.status_text = format!(
            "Last Updated: {} - {} rates active - {} updates received",
            now.format("%H:%M:%S"),
            self.rows.len(),
            self.update_count
        );
        self.changes.notify(&ListChange::StatusText);
        self.refresh_time_ago();
    }

    /// Replace the status line.
    pub fn set_status_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.status_text != text {
            self.status_text = text;
            self.changes.notify(&ListChange::StatusText);
        }
    }

    fn refresh_time_ago(&mut self) {
        for index in 0..self.rows.len() {
            self.changes.notify(&ListChange::TimeAgoRefreshed { index });
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Rows in first-seen order.
    #[must_use]
    pub fn rows(&self) -> &[RateViewModel] {
        &self.rows
    }

    /// Row for an instrument.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RateViewModel> {
        self.index.get(key).map(|&i| &self.rows[i])
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Current status line.
    #[must_use]
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Total updates applied.
    #[must_use]
    pub const fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Curve used for new rows.
    #[must_use]
    pub const fn curve(&self) -> DecayCurve {
        self.curve
    }

    /// List change listeners.
    pub fn changes_mut(&mut self) -> &mut ChangeNotifier<ListChange> {
        &mut self.changes
    }
}
