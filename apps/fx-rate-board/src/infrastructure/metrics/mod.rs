//! Prometheus Metrics Module
//!
//! Counters and gauges for the publish path and the UI context.
//!
//! # Metrics Categories
//!
//! - **Publishing**: accepted and rejected rates, publish latency
//! - **Subscribers**: handler failures and registration count
//! - **UI**: dropped dispatches and pulse restarts
//!
//! # Integration
//!
//! The recorder is in-process only. The binary renders the exposition text
//! into the log at shutdown. Without an installed recorder every recording
//! function is a no-op, which is what unit tests rely on.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::rate::ValidationError;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder.
///
/// Repeated calls return the handle installed by the first one.
///
/// # Errors
///
/// Returns [`BuildError`] if another global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "fx_board_rates_published_total",
        "Rates accepted by the market hub"
    );
    describe_counter!(
        "fx_board_rates_rejected_total",
        "Rates rejected by validation, by reason"
    );
    describe_histogram!(
        "fx_board_publish_seconds",
        "Time to store a rate and deliver it to all subscribers"
    );

    describe_counter!(
        "fx_board_subscriber_failures_total",
        "Subscriber handlers that panicked during delivery"
    );
    describe_gauge!("fx_board_subscribers", "Registered hub subscribers");
    describe_gauge!("fx_board_instruments", "Instruments in the hub table");

    describe_counter!(
        "fx_board_ui_dispatch_dropped_total",
        "Updates dropped because the UI context had stopped"
    );
    describe_counter!(
        "fx_board_pulse_restarts_total",
        "Highlight pulses started or restarted"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a rate accepted by the hub.
pub fn record_rate_published(instrument: &str) {
    counter!(
        "fx_board_rates_published_total",
        "instrument" => instrument.to_string()
    )
    .increment(1);
}

/// Record a rate rejected by validation.
pub fn record_rate_rejected(error: &ValidationError) {
    counter!(
        "fx_board_rates_rejected_total",
        "reason" => error.reason()
    )
    .increment(1);
}

/// Record how long one publish took.
pub fn record_publish_duration(duration: Duration) {
    histogram!("fx_board_publish_seconds").record(duration.as_secs_f64());
}

/// Record a subscriber handler failure.
pub fn record_subscriber_failure() {
    counter!("fx_board_subscriber_failures_total").increment(1);
}

/// Update the subscriber count.
#[allow(clippy::cast_precision_loss)]
pub fn set_subscribers(count: usize) {
    gauge!("fx_board_subscribers").set(count as f64);
}

/// Update the instrument count.
#[allow(clippy::cast_precision_loss)]
pub fn set_instruments(count: usize) {
    gauge!("fx_board_instruments").set(count as f64);
}

/// Record an update dropped because the UI context had stopped.
pub fn record_ui_dispatch_dropped() {
    counter!("fx_board_ui_dispatch_dropped_total").increment(1);
}

/// Record a pulse start or restart.
pub fn record_pulse_restart() {
    counter!("fx_board_pulse_restarts_total").increment(1);
}

// =============================================================================
// Tests
// =============================================================================
