//! Application Services
//!
//! Producers and the plumbing that starts and stops them.
//!
//! - `RateGenerator`: simulated feed publishing into a `RatePublisher`
//! - `TaskHandle`: cancellable handle for spawned producer loops

/// Simulated rate feed.
pub mod generator;

/// Background task lifecycle.
pub mod lifecycle;

pub use generator::{
    DEFAULT_SOURCE, DEFAULT_UPDATED_BY, GeneratorConfig, Instrument, RateGenerator, TickSummary,
    default_universe,
};
pub use lifecycle::{ShutdownError, TaskHandle};

/// Handle returned by [`RateGenerator::spawn`].
pub type GeneratorHandle = TaskHandle;
