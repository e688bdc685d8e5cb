//! Application Layer - Producers and port definitions.
//!
//! This layer holds the rate producer and the port interfaces that
//! connect producers, the hub and consumers.

/// Port interfaces for rate publishing and subscription.
pub mod ports;

/// Application services for rate generation and task lifecycle.
pub mod services;
