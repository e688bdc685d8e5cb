//! Presentation State
//!
//! Framework-neutral view-models for the rate board. All state here is
//! owned and mutated by the single UI context; renderers observe it through
//! [`ChangeNotifier`] listeners.
//!
//! - [`RateViewModel`]: one instrument, with the decaying change highlight
//! - [`RateListViewModel`]: rows in first-seen order plus the status line

mod highlight;
mod list;
mod notify;
mod view_model;

pub use highlight::{DecayCurve, HighlightDirection, Rgba};
pub use list::{ApplyOutcome, INITIAL_STATUS, ListChange, RateListViewModel};
pub use notify::{ChangeNotifier, ListenerId};
pub use view_model::{DecayProgress, RateProperty, RateViewModel};
