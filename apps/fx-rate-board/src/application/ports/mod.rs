//! Port Interfaces
//!
//! Contracts between rate producers, the hub and rate consumers.
//!
//! ## Driven Ports (Outbound)
//!
//! - `RateSubscriber`: receives every published rate that matches its filter
//!
//! ## Driver Ports (Inbound)
//!
//! - `RatePublisher`: accepts rates from a feed (simulator or real source)

use std::fmt;

use crate::domain::rate::{Rate, ValidationError};

/// Handler invoked for each published rate.
///
/// Called synchronously on the publishing thread. Implementations must hand
/// work off (e.g. post to a UI queue) rather than do it inline, and must not
/// publish back into the hub from inside the callback.
#[cfg_attr(test, mockall::automock)]
pub trait RateSubscriber: Send + Sync {
    /// Human-readable name used in logs.
    fn description(&self) -> String;

    /// Receive a published rate.
    fn on_rate_update(&self, rate: &Rate);
}

/// Outcome of a successful publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers that received the rate.
    pub delivered: usize,
    /// Subscribers whose handler failed.
    pub failed: usize,
}

/// Accepts rates from a producer.
#[cfg_attr(test, mockall::automock)]
pub trait RatePublisher: Send + Sync {
    /// Publish a rate to the canonical table and all subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the rate is malformed; nothing is
    /// stored or delivered in that case.
    fn publish(&self, rate: Rate) -> Result<PublishReport, ValidationError>;
}

/// Subscriber backed by a closure.
pub struct FnSubscriber<F> {
    description: String,
    handler: F,
}

impl<F> FnSubscriber<F>
where
    F: Fn(&Rate) + Send + Sync,
{
    /// Wrap a closure.
    pub fn new(description: impl Into<String>, handler: F) -> Self {
        Self {
            description: description.into(),
            handler,
        }
    }
}

impl<F> fmt::Debug for FnSubscriber<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSubscriber")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<F> RateSubscriber for FnSubscriber<F>
where
    F: Fn(&Rate) + Send + Sync,
{
    fn description(&self) -> String {
        self.description.clone()
    }

    fn on_rate_update(&self, rate: &Rate) {
        (self.handler)(rate);
    }
}
