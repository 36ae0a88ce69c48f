//! Cancellation handles.

use core::fmt;

/// RAII guard returned by every `subscribe` call.
///
/// Dropping the guard (or calling [`Subscription::unsubscribe`]) detaches the
/// observer from all of its upstream sources immediately. Teardown runs on
/// every exit path, including unwinding.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// A subscription that runs `teardown` when released.
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A subscription with nothing to release.
    pub const fn empty() -> Self {
        Self { teardown: None }
    }

    /// Combine several guards into one that releases them in order.
    pub fn all(subscriptions: Vec<Self>) -> Self {
        Self::new(move || drop(subscriptions))
    }

    /// Release now. Equivalent to dropping the guard.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Whether the teardown has not run yet.
    pub const fn is_active(&self) -> bool {
        self.teardown.is_some()
    }

    fn release(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn teardown_runs_once() {
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let subscription = Subscription::new(move || counter.set(counter.get() + 1));
        assert!(subscription.is_active());
        subscription.unsubscribe();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn combined_guard_releases_all() {
        let count = Rc::new(Cell::new(0));
        let guards = (0..3)
            .map(|_| {
                let counter = Rc::clone(&count);
                Subscription::new(move || counter.set(counter.get() + 1))
            })
            .collect();
        drop(Subscription::all(guards));
        assert_eq!(count.get(), 3);
    }
}
