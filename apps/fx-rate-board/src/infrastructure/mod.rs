//! Infrastructure Layer - Adapters and runtime wiring.
//!
//! This layer contains the market hub, the UI context, and the ambient
//! configuration, logging and metrics setup.

/// Environment-driven configuration.
pub mod config;

/// Market hub: canonical rate table and subscriber fan-out.
pub mod hub;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Startup and ordered shutdown of the whole board.
pub mod runtime;

/// Logging and OpenTelemetry tracing integration.
pub mod telemetry;

/// Single-threaded UI context and its cross-thread bridge.
pub mod ui;
