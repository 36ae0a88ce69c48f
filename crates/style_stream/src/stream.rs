//! The cold stream type and its constructors.

use crate::error::StreamError;
use crate::sink::{Event, Sink};
use crate::subscription::Subscription;
use core::fmt;
use std::rc::Rc;

/// Producer callback: push into the sink, return what to release on cancel.
type Producer<T> = dyn Fn(Sink<T>) -> Subscription;

/// A subscribable source of values.
///
/// A stream is a recipe: nothing runs until [`Stream::subscribe`] is called,
/// and every subscription runs the recipe again with its own state.
pub struct Stream<T> {
    producer: Rc<Producer<T>>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            producer: Rc::clone(&self.producer),
        }
    }
}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Stream").finish_non_exhaustive()
    }
}

impl<T: 'static> Stream<T> {
    /// Build a stream from a producer callback.
    pub fn new(producer: impl Fn(Sink<T>) -> Subscription + 'static) -> Self {
        Self {
            producer: Rc::new(producer),
        }
    }

    /// Subscribe an observer callback.
    pub fn subscribe(&self, observer: impl Fn(Event<T>) + 'static) -> Subscription {
        self.subscribe_sink(Sink::new(observer))
    }

    /// Subscribe an existing sink. Used by operators to chain streams.
    pub fn subscribe_sink(&self, sink: Sink<T>) -> Subscription {
        let upstream = (self.producer)(sink.clone());
        Subscription::new(move || {
            sink.close();
            drop(upstream);
        })
    }

    /// A stream that never emits and never terminates.
    pub fn never() -> Self {
        Self::new(|_sink| Subscription::empty())
    }

    /// A stream that fails immediately on subscription.
    pub fn failed(error: StreamError) -> Self {
        Self::new(move |sink| {
            sink.fail(error.clone());
            Subscription::empty()
        })
    }

    /// A stream that ends immediately on subscription.
    pub fn ended(reason: Option<String>) -> Self {
        Self::new(move |sink| {
            sink.end(reason.clone());
            Subscription::empty()
        })
    }

    /// Build the actual stream lazily, once per subscription.
    pub fn defer(factory: impl Fn() -> Self + 'static) -> Self {
        Self::new(move |sink| factory().subscribe_sink(sink))
    }
}

impl<T: Clone + 'static> Stream<T> {
    /// A stream holding one value forever.
    ///
    /// The value is delivered on subscription; the stream does not end on its
    /// own, so combining it with a live stream keeps the combination live.
    pub fn constant(value: T) -> Self {
        Self::new(move |sink| {
            sink.next(value.clone());
            Subscription::empty()
        })
    }
}
