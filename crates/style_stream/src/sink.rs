//! Observer-side endpoint of a subscription.

use crate::error::StreamError;
use core::cell::Cell;
use core::fmt;
use std::rc::Rc;

/// A notification delivered to an observer.
#[derive(Debug, Clone)]
pub enum Event<T> {
    /// A new value.
    Next(T),
    /// Terminal failure. No further events follow.
    Failed(StreamError),
    /// Terminal end, with the reason given by whoever ended the stream.
    Ended(Option<String>),
}

impl<T> Event<T> {
    /// True for [`Event::Failed`] and [`Event::Ended`].
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Next(_))
    }
}

/// Shared state behind a [`Sink`].
struct SinkInner<T> {
    /// Set once a terminal event was delivered or the subscription dropped.
    closed: Cell<bool>,
    /// Downstream callback.
    observer: Box<dyn Fn(Event<T>)>,
}

/// Where a producer pushes events.
///
/// A sink forwards to its observer until it is closed, either by a terminal
/// event or by the owning [`Subscription`](crate::Subscription) being dropped.
/// Everything after that is silently discarded.
pub struct Sink<T> {
    inner: Rc<SinkInner<T>>,
}

impl<T> Clone for Sink<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Sink<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Sink")
            .field("closed", &self.inner.closed.get())
            .finish_non_exhaustive()
    }
}

impl<T> Sink<T> {
    /// Wrap an observer callback.
    pub fn new(observer: impl Fn(Event<T>) + 'static) -> Self {
        Self {
            inner: Rc::new(SinkInner {
                closed: Cell::new(false),
                observer: Box::new(observer),
            }),
        }
    }

    /// Deliver a value unless the sink is closed.
    #[inline]
    pub fn next(&self, value: T) {
        if !self.inner.closed.get() {
            (self.inner.observer)(Event::Next(value));
        }
    }

    /// Deliver a terminal failure; later events are dropped.
    pub fn fail(&self, error: StreamError) {
        if !self.inner.closed.replace(true) {
            (self.inner.observer)(Event::Failed(error));
        }
    }

    /// Deliver a terminal end; later events are dropped.
    pub fn end(&self, reason: Option<String>) {
        if !self.inner.closed.replace(true) {
            (self.inner.observer)(Event::Ended(reason));
        }
    }

    /// Forward any event.
    pub fn send(&self, event: Event<T>) {
        match event {
            Event::Next(value) => self.next(value),
            Event::Failed(error) => self.fail(error),
            Event::Ended(reason) => self.end(reason),
        }
    }

    /// Whether this sink still accepts events.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    /// Stop delivering without notifying the observer.
    #[inline]
    pub(crate) fn close(&self) {
        self.inner.closed.set(true);
    }

    /// Whether two sinks share the same observer.
    #[cfg(test)]
    pub(crate) fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}
