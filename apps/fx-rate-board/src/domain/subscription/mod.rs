//! Subscription Registry Types
//!
//! Domain types for tracking who receives published rates.
//!
//! # Design
//!
//! The registry keeps its entries behind an `Arc<Vec<_>>` and copies on
//! write. A publisher takes a cheap clone of the current entry list and
//! iterates it without holding any lock, so registering or removing a
//! subscriber never races with an in-progress fan-out. A subscriber that
//! registers after the snapshot was taken is simply not part of that
//! delivery.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::rate::InstrumentKey;

// =============================================================================
// Types
// =============================================================================

/// Unique identifier for a registration.
pub type SubscriptionId = u64;

/// Opaque registration returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
}

impl SubscriptionHandle {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn from_id(id: SubscriptionId) -> Self {
        Self { id }
    }

    /// The raw identifier.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }
}

/// Which instruments a subscriber is eligible to receive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubscriptionFilter {
    /// Every instrument.
    #[default]
    All,
    /// Only the listed instruments.
    Instruments(HashSet<InstrumentKey>),
}

impl SubscriptionFilter {
    /// Filter for a fixed set of instruments.
    #[must_use]
    pub fn instruments<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<InstrumentKey>,
    {
        Self::Instruments(keys.into_iter().map(Into::into).collect())
    }

    /// Whether a rate for `key` should be delivered.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::All => true,
            Self::Instruments(keys) => keys.contains(key),
        }
    }

    /// Whether this is the catch-all filter.
    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

// =============================================================================
// Subscriber Errors
// =============================================================================

/// A subscriber handler failed during delivery.
///
/// Never propagated to the publisher; logged and counted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("subscriber '{subscriber}' failed: {message}")]
pub struct SubscriberError {
    /// Subscriber description.
    pub subscriber: String,
    /// Failure message.
    pub message: String,
}

impl SubscriberError {
    /// Build from a panic payload caught by `catch_unwind`.
    #[must_use]
    pub fn from_panic(subscriber: impl Into<String>, payload: &(dyn std::any::Any + Send)) -> Self {
        Self {
            subscriber: subscriber.into(),
            message: panic_message(payload),
        }
    }
}

/// Text of a panic payload caught by `catch_unwind`.
#[must_use]
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string())
}

// =============================================================================
// Registry
// =============================================================================

/// A single registration.
#[derive(Debug, Clone)]
pub struct Registration<S> {
    /// Handle returned to the caller.
    pub handle: SubscriptionHandle,
    /// Delivery filter.
    pub filter: SubscriptionFilter,
    /// The registered handler.
    pub subscriber: S,
}

/// Copy-on-write list of registrations.
#[derive(Debug)]
pub struct SubscriberRegistry<S> {
    entries: Arc<Vec<Registration<S>>>,
    next_id: SubscriptionId,
}

impl<S> Default for SubscriberRegistry<S> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Vec::new()),
            next_id: 1,
        }
    }
}

impl<S: Clone> SubscriberRegistry<S> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler and return its handle.
    pub fn register(&mut self, subscriber: S, filter: SubscriptionFilter) -> SubscriptionHandle {
        let handle = SubscriptionHandle::from_id(self.next_id);
        self.next_id += 1;

        Arc::make_mut(&mut self.entries).push(Registration {
            handle,
            filter,
            subscriber,
        });

        handle
    }

    /// Remove a registration.
    ///
    /// Returns `false` for unknown or already-removed handles.
    pub fn unregister(&mut self, handle: SubscriptionHandle) -> bool {
        let Some(position) = self.entries.iter().position(|e| e.handle == handle) else {
            return false;
        };

        Arc::make_mut(&mut self.entries).remove(position);
        true
    }

    /// Remove every registration, returning how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries = Arc::new(Vec::new());
        removed
    }

    /// Current registrations, frozen at the time of the call.
    #[must_use]
    pub fn entries(&self) -> Arc<Vec<Registration<S>>> {
        Arc::clone(&self.entries)
    }

    /// Whether a handle is currently registered.
    #[must_use]
    pub fn contains(&self, handle: SubscriptionHandle) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }

    /// Number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no registrations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registration statistics.
    #[must_use]
    pub fn stats(&self) -> SubscriptionStats {
        let all = self.entries.iter().filter(|e| e.filter.is_all()).count();
        SubscriptionStats {
            subscriber_count: self.entries.len(),
            all_instruments_count: all,
            filtered_count: self.entries.len() - all,
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Registry statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionStats {
    /// Total registrations.
    pub subscriber_count: usize,
    /// Registrations receiving every instrument.
    pub all_instruments_count: usize,
    /// Registrations with an instrument filter.
    pub filtered_count: usize,
}

// =============================================================================
// Tests
// =============================================================================
