//! Typed observer registry with explicit subscription handles.

use std::fmt;

/// Handle returned by [`Subscribers::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Observer<T> = Box<dyn FnMut(&T)>;

/// Registry of observers notified synchronously with values of type `T`.
pub struct Subscribers<T> {
    next_id: u64,
    observers: Vec<(Subscription, Observer<T>)>,
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            observers: Vec::new(),
        }
    }
}

impl<T> fmt::Debug for Subscribers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl<T> Subscribers<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer and returns the handle needed to remove it.
    pub fn subscribe<F>(&mut self, observer: F) -> Subscription
    where
        F: FnMut(&T) + 'static,
    {
        let subscription = Subscription(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.observers.push((subscription, Box::new(observer)));
        subscription
    }

    /// Removes an observer, returning whether it was registered.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(id, _)| *id != subscription);
        self.observers.len() != before
    }

    /// Notifies every observer in subscription order.
    pub fn notify(&mut self, value: &T) {
        for (_, observer) in &mut self.observers {
            observer(value);
        }
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Reports whether no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
