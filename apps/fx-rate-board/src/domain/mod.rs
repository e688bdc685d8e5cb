//! Domain Layer - Core rate types and presentation state.
//!
//! This layer contains the value types, the subscription registry and the
//! view-models, with no runtime or I/O dependencies.

/// FX rate value type and latest-value table.
pub mod rate;

/// Subscription tracking.
pub mod subscription;

/// View-models and the pulse/decay state machine.
pub mod presentation;
