//! Hot value holder with push notification.

use crate::batch;
use crate::error::StreamError;
use crate::revision::{Revision, RevisionCounter};
use crate::sink::{Event, Sink};
use crate::stream::Stream;
use crate::subscription::Subscription;
use core::cell::RefCell;
use core::fmt;
use core::mem::take;
use std::collections::VecDeque;
use log::trace;
use std::rc::{Rc, Weak};

/// Mutable part of a subject.
struct SubjectState<T> {
    /// Latest published value.
    value: Option<T>,
    /// Terminal event, once the subject failed or ended.
    terminal: Option<Event<T>>,
    /// Registered observers in registration order.
    observers: Vec<Observer<T>>,
    /// Id handed to the next observer.
    next_id: u64,
    /// Events published but not yet delivered, oldest first.
    pending: VecDeque<(Revision, Event<T>)>,
    /// Set while `drain` runs further up the stack.
    draining: bool,
}

struct Observer<T> {
    id: u64,
    sink: Sink<T>,
    /// Revision the observer was handed on attach. Older events are skipped.
    since: Revision,
}

struct SubjectInner<T> {
    state: RefCell<SubjectState<T>>,
    revision: RevisionCounter,
}

/// A value holder that pushes every update to its current observers.
///
/// Observers subscribed through [`Subject::stream`] receive the latest value
/// right away and every later [`Subject::set`]. Once the subject fails or
/// ends, all observers get the terminal event and later subscribers receive
/// it immediately.
pub struct Subject<T> {
    inner: Rc<SubjectInner<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        formatter
            .debug_struct("Subject")
            .field("revision", &self.inner.revision.current())
            .field("observers", &state.observers.len())
            .field("terminated", &state.terminal.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: Clone + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> Subject<T> {
    /// A subject with no value yet.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SubjectInner {
                state: RefCell::new(SubjectState {
                    value: None,
                    terminal: None,
                    observers: Vec::new(),
                    next_id: 0,
                    pending: VecDeque::new(),
                    draining: false,
                }),
                revision: RevisionCounter::new(),
            }),
        }
    }

    /// A subject holding `value`.
    pub fn with_value(value: T) -> Self {
        let subject = Self::new();
        subject.inner.state.borrow_mut().value = Some(value);
        subject.inner.revision.increment();
        subject
    }

    /// Publish a new value. Ignored once the subject is terminated.
    ///
    /// A `set` made by an observer while an earlier value is still being
    /// delivered is queued, so every observer sees the values in the order
    /// they were published.
    pub fn set(&self, value: T) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.terminal.is_some() {
                trace!("Ignoring update of a terminated subject");
                return;
            }
            state.value = Some(value.clone());
            let revision = self.inner.revision.increment();
            state.pending.push_back((revision, Event::Next(value)));
        }
        self.drain();
    }

    /// Terminate every observer with a failure.
    pub fn fail(&self, error: StreamError) {
        self.terminate(Event::Failed(error));
    }

    /// Terminate every observer with an end event.
    pub fn end(&self, reason: Option<String>) {
        self.terminate(Event::Ended(reason));
    }

    /// The latest value, if any.
    pub fn value(&self) -> Option<T> {
        self.inner.state.borrow().value.clone()
    }

    /// Revision of the latest value.
    pub fn revision(&self) -> Revision {
        self.inner.revision.current()
    }

    /// Whether [`Subject::fail`] or [`Subject::end`] was called.
    pub fn is_terminated(&self) -> bool {
        self.inner.state.borrow().terminal.is_some()
    }

    /// Number of currently registered observers.
    pub fn observer_count(&self) -> usize {
        self.inner.state.borrow().observers.len()
    }

    /// A stream over this subject's values.
    pub fn stream(&self) -> Stream<T> {
        let inner = Rc::clone(&self.inner);
        Stream::new(move |sink| Self::attach(&inner, sink))
    }

    fn attach(inner: &Rc<SubjectInner<T>>, sink: Sink<T>) -> Subscription {
        let (id, current) = {
            let mut state = inner.state.borrow_mut();
            if let Some(terminal) = state.terminal.clone() {
                drop(state);
                sink.send(terminal);
                return Subscription::empty();
            }
            let id = state.next_id;
            state.next_id = id.saturating_add(1);
            state.observers.push(Observer {
                id,
                sink: sink.clone(),
                since: inner.revision.current(),
            });
            (id, state.value.clone())
        };
        if let Some(value) = current {
            sink.next(value);
        }
        let weak: Weak<SubjectInner<T>> = Rc::downgrade(inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .state
                    .borrow_mut()
                    .observers
                    .retain(|observer| observer.id != id);
            }
        })
    }

    fn terminate(&self, event: Event<T>) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.terminal.is_some() {
                return;
            }
            state.terminal = Some(event.clone());
            let revision = self.inner.revision.current();
            state.pending.push_back((revision, event));
        }
        self.drain();
    }

    /// Deliver queued events one at a time. Only the outermost call on the
    /// stack delivers; nested calls leave their events in the queue.
    fn drain(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.draining {
                return;
            }
            state.draining = true;
        }
        batch::within(|| {
            loop {
                let (event, sinks) = {
                    let mut state = self.inner.state.borrow_mut();
                    let Some((revision, event)) = state.pending.pop_front() else {
                        state.draining = false;
                        return;
                    };
                    let sinks = if event.is_terminal() {
                        take(&mut state.observers)
                            .into_iter()
                            .map(|observer| observer.sink)
                            .collect()
                    } else {
                        Self::live_observers(&state, revision)
                    };
                    (event, sinks)
                };
                for sink in sinks {
                    sink.send(event.clone());
                }
            }
        });
    }

    /// Open observers that attached before `revision` was published.
    fn live_observers(state: &SubjectState<T>, revision: Revision) -> Vec<Sink<T>> {
        state
            .observers
            .iter()
            .filter(|observer| revision.is_after(observer.since) && !observer.sink.is_closed())
            .map(|observer| observer.sink.clone())
            .collect()
    }

    /// Whether `sink` is registered. Test hook for teardown checks.
    #[cfg(test)]
    fn is_registered(&self, sink: &Sink<T>) -> bool {
        self.inner
            .state
            .borrow()
            .observers
            .iter()
            .any(|observer| observer.sink.same_as(sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(subject: &Subject<u32>) -> (Rc<RefCell<Vec<Event<u32>>>>, Subscription) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let events = Rc::clone(&log);
        let subscription = subject
            .stream()
            .subscribe(move |event| events.borrow_mut().push(event));
        (log, subscription)
    }

    #[test]
    fn delivers_current_then_updates() {
        let subject = Subject::with_value(1);
        let (log, _sub) = collect(&subject);
        subject.set(2);
        subject.set(2);
        assert!(matches!(
            log.borrow().as_slice(),
            [Event::Next(1), Event::Next(2), Event::Next(2)]
        ));
        assert_eq!(subject.revision().get(), 3);
    }

    #[test]
    fn empty_subject_waits_for_first_value() {
        let subject = Subject::new();
        let (log, _sub) = collect(&subject);
        assert!(log.borrow().is_empty());
        subject.set(5);
        assert!(matches!(log.borrow().as_slice(), [Event::Next(5)]));
    }

    #[test]
    fn unsubscribe_detaches_observer() {
        let subject = Subject::with_value(1);
        let (log, sub) = collect(&subject);
        assert_eq!(subject.observer_count(), 1);
        sub.unsubscribe();
        assert_eq!(subject.observer_count(), 0);
        subject.set(9);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn end_reaches_current_and_late_observers() {
        let subject = Subject::with_value(1);
        let (early, _sub) = collect(&subject);
        subject.end(Some("removed".into()));
        subject.set(4);
        let (late, _late_sub) = collect(&subject);
        assert!(matches!(early.borrow().as_slice(), [Event::Next(1), Event::Ended(Some(_))]));
        assert!(matches!(late.borrow().as_slice(), [Event::Ended(Some(_))]));
        assert!(subject.is_terminated());
    }

    #[test]
    fn reentrant_set_from_observer_is_delivered_in_order() {
        let subject = Subject::with_value(0);
        let feedback = subject.clone();
        let log = Rc::new(RefCell::new(Vec::new()));
        let events = Rc::clone(&log);
        let _sub = subject.stream().subscribe(move |event| {
            if let Event::Next(value) = event {
                events.borrow_mut().push(value);
                if value == 1 {
                    feedback.set(2);
                }
            }
        });
        subject.set(1);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn nested_set_reaches_every_observer_in_order() {
        let subject = Subject::with_value(0);
        let feedback = subject.clone();
        let _first_sub = subject.stream().subscribe(move |event| {
            if matches!(event, Event::Next(1)) {
                feedback.set(2);
            }
        });
        let (log, _second_sub) = collect(&subject);
        subject.set(1);
        assert!(matches!(
            log.borrow().as_slice(),
            [Event::Next(0), Event::Next(1), Event::Next(2)]
        ));
        assert_eq!(subject.value(), Some(2));
    }

    #[test]
    fn observer_attached_mid_delivery_starts_at_the_latest_value() {
        let subject = Subject::with_value(0);
        let late_log = Rc::new(RefCell::new(Vec::new()));
        let late_sub = Rc::new(RefCell::new(None));
        let source = subject.clone();
        let events = Rc::clone(&late_log);
        let slot = Rc::clone(&late_sub);
        let _sub = subject.stream().subscribe(move |event| {
            if matches!(event, Event::Next(1)) {
                source.set(2);
                let sink = Rc::clone(&events);
                *slot.borrow_mut() = Some(
                    source
                        .stream()
                        .subscribe(move |late_event| sink.borrow_mut().push(late_event)),
                );
            }
        });
        subject.set(1);
        assert!(matches!(late_log.borrow().as_slice(), [Event::Next(2)]));
        assert!(late_sub.borrow().is_some());
    }

    #[test]
    fn end_is_delivered_after_queued_values() {
        let subject = Subject::with_value(0);
        let feedback = subject.clone();
        let _first_sub = subject.stream().subscribe(move |event| {
            if matches!(event, Event::Next(1)) {
                feedback.set(2);
                feedback.end(None);
            }
        });
        let (log, _second_sub) = collect(&subject);
        subject.set(1);
        assert!(matches!(
            log.borrow().as_slice(),
            [Event::Next(0), Event::Next(1), Event::Next(2), Event::Ended(None)]
        ));
    }

    #[test]
    fn dropped_sink_is_no_longer_registered() {
        let subject = Subject::with_value(3);
        let sink = Sink::new(|_event: Event<u32>| {});
        let subscription = subject.stream().subscribe_sink(sink.clone());
        assert!(subject.is_registered(&sink));
        drop(subscription);
        assert!(!subject.is_registered(&sink));
        assert!(sink.is_closed());
    }
}
