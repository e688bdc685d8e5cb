#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::redundant_clone,
        clippy::items_after_statements
    )
)]

//! FX Rate Board - Simulated Rate Fan-out
//!
//! A simulated FX feed publishes two-sided rates into a market hub, which
//! fans them out to subscribers. The board subscriber carries each rate onto
//! a single-threaded UI context where per-instrument view-models flash a
//! decaying highlight on every move.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Rate values and presentation state machines
//!   - `rate`: `Rate`, `RateStore`, validation
//!   - `subscription`: handles, filters, subscriber registry
//!   - `presentation`: view-models, decay curve, change notifications
//!
//! - **Application**: Producers and port definitions
//!   - `ports`: `RateSubscriber`, `RatePublisher`
//!   - `services`: rate generator, task lifecycle
//!
//! - **Infrastructure**: Adapters and runtime wiring
//!   - `hub`: canonical table and synchronous fan-out
//!   - `ui`: dispatcher, UI context, decay timers, renderer
//!   - `config`, `telemetry`, `metrics`: ambient setup
//!   - `runtime`: startup and ordered shutdown
//!
//! # Data Flow
//!
//! ```text
//! RateGenerator ──► MarketHub::publish ──► UiSubscriber ──► UiDispatcher
//!                     │ (table update)                          │
//!                     ▼                                          ▼
//!                 snapshot()                            UiContext::run
//!                                                 RateListViewModel::apply
//!                                                 RateViewModel::update ──► pulse
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Rate values and presentation state with no I/O.
pub mod domain;

/// Application layer - Producers and port definitions.
pub mod application;

/// Infrastructure layer - Hub, UI context and runtime wiring.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::presentation::{
    ApplyOutcome, ChangeNotifier, DecayCurve, DecayProgress, HighlightDirection, ListChange,
    RateListViewModel, RateProperty, RateViewModel, Rgba,
};
pub use domain::rate::{InstrumentKey, Rate, RateStore, ValidationError};
pub use domain::subscription::{
    SubscriberError, SubscriptionFilter, SubscriptionHandle, SubscriptionStats,
};

// Ports and services
pub use application::ports::{FnSubscriber, PublishReport, RatePublisher, RateSubscriber};
pub use application::services::{
    GeneratorConfig, GeneratorHandle, Instrument, RateGenerator, ShutdownError, TaskHandle,
    default_universe,
};

// Hub
pub use infrastructure::hub::{MarketHub, MarketSnapshot, SharedMarketHub, SnapshotMonitor};

// UI context
pub use infrastructure::ui::{DispatchError, UiContext, UiDispatcher, UiMessage, UiSubscriber};

// Runtime
pub use infrastructure::runtime::BoardRuntime;

// Infrastructure config
pub use infrastructure::config::{BoardConfig, ConfigError};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
