//! Change notification for presentation state.
//!
//! Rendering layers register listeners here instead of depending on any UI
//! framework's notification type. Listeners run inline on the UI context.

use std::fmt;

/// Identifier returned by [`ChangeNotifier::subscribe`].
pub type ListenerId = u64;

type Listener<E> = Box<dyn FnMut(&E) + Send>;

/// Ordered list of change listeners for events of type `E`.
pub struct ChangeNotifier<E> {
    listeners: Vec<(ListenerId, Listener<E>)>,
    next_id: ListenerId,
}

impl<E> Default for ChangeNotifier<E> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 1,
        }
    }
}

impl<E> fmt::Debug for ChangeNotifier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<E> ChangeNotifier<E> {
    /// Create a notifier with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners are called in registration order.
    pub fn subscribe(&mut self, listener: impl FnMut(&E) + Send + 'static) -> ListenerId {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        before != self.listeners.len()
    }

    /// Deliver an event to every listener.
    pub fn notify(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
