//! Stream operators.
//!
//! Every operator builds fresh per-subscription state inside its producer,
//! so two observers of the same derived stream never share intermediate
//! values.

use crate::batch;
use crate::revision::RevisionCounter;
use crate::sink::{Event, Sink};
use crate::stream::Stream;
use crate::subscription::Subscription;
use core::cell::RefCell;
use core::mem::replace;
use log::trace;
use std::rc::{Rc, Weak};

/// Latest value of each side of a `combine_latest`.
struct CombineState<A, B> {
    left: Option<A>,
    right: Option<B>,
    left_ended: bool,
    right_ended: bool,
    /// An emission is waiting for the current batch to close.
    scheduled: bool,
}

impl<A, B> CombineState<A, B> {
    /// The combination can never emit again.
    const fn exhausted(&self) -> bool {
        (self.left_ended && self.right_ended)
            || (self.left_ended && self.left.is_none())
            || (self.right_ended && self.right.is_none())
    }
}

/// Current inner subscription of a `switch_map`.
struct SwitchState {
    inner: RefCell<Option<Subscription>>,
    generation: RevisionCounter,
}

impl SwitchState {
    fn release_inner(&self) {
        let previous = self.inner.borrow_mut().take();
        drop(previous);
    }
}

impl<T: 'static> Stream<T> {
    /// Transform every value.
    pub fn map<U: 'static>(&self, transform: impl Fn(T) -> U + 'static) -> Stream<U> {
        let source = self.clone();
        let transform = Rc::new(transform);
        Stream::new(move |sink: Sink<U>| {
            let transform = Rc::clone(&transform);
            source.subscribe(move |event| match event {
                Event::Next(value) => sink.next(transform(value)),
                Event::Failed(error) => sink.fail(error),
                Event::Ended(reason) => sink.end(reason),
            })
        })
    }

    /// Replace the current inner stream every time this stream emits.
    ///
    /// Values of the inner stream are forwarded until the next outer value
    /// arrives, which drops the previous inner subscription first. An inner
    /// end is ignored; the last forwarded value stays current. An outer end or
    /// failure terminates the result immediately.
    pub fn switch_map<U: 'static>(&self, project: impl Fn(T) -> Stream<U> + 'static) -> Stream<U> {
        let source = self.clone();
        let project = Rc::new(project);
        Stream::new(move |sink: Sink<U>| {
            let project = Rc::clone(&project);
            let state = Rc::new(SwitchState {
                inner: RefCell::new(None),
                generation: RevisionCounter::new(),
            });
            let outer_state = Rc::clone(&state);
            let outer = source.subscribe(move |event| match event {
                Event::Next(value) => {
                    let generation = outer_state.generation.increment();
                    outer_state.release_inner();
                    let weak: Weak<SwitchState> = Rc::downgrade(&outer_state);
                    let inner_sink = sink.clone();
                    let subscription = project(value).subscribe(move |inner_event| {
                        let current = weak
                            .upgrade()
                            .is_some_and(|live| live.generation.current() == generation);
                        if !current {
                            return;
                        }
                        match inner_event {
                            Event::Next(inner_value) => inner_sink.next(inner_value),
                            Event::Failed(error) => inner_sink.fail(error),
                            Event::Ended(_) => {}
                        }
                    });
                    if outer_state.generation.current() == generation {
                        *outer_state.inner.borrow_mut() = Some(subscription);
                    } else {
                        trace!("Inner stream superseded during subscription");
                    }
                }
                Event::Failed(error) => {
                    outer_state.release_inner();
                    sink.fail(error);
                }
                Event::Ended(reason) => {
                    outer_state.release_inner();
                    sink.end(reason);
                }
            });
            Subscription::new(move || {
                drop(outer);
                state.release_inner();
            })
        })
    }
}

impl<T: Clone + 'static> Stream<T> {
    /// Drop values that `same` considers equal to the last forwarded one.
    pub fn distinct_by(&self, same: impl Fn(&T, &T) -> bool + 'static) -> Self {
        let source = self.clone();
        let same = Rc::new(same);
        Self::new(move |sink| {
            let same = Rc::clone(&same);
            let last: RefCell<Option<T>> = RefCell::new(None);
            source.subscribe(move |event| match event {
                Event::Next(value) => {
                    let duplicate = last
                        .borrow()
                        .as_ref()
                        .is_some_and(|previous| same(previous, &value));
                    if duplicate {
                        trace!("Suppressed duplicate emission");
                        return;
                    }
                    *last.borrow_mut() = Some(value.clone());
                    sink.next(value);
                }
                terminal => sink.send(terminal),
            })
        })
    }

    /// Combine the latest values of two streams.
    ///
    /// Emits only once both sides have produced a value, then on every update
    /// of either side. Fails as soon as either side fails. Ends when both
    /// sides ended, or when a side ended before producing anything.
    ///
    /// Updates arriving while a [`Subject`](crate::Subject) delivers are
    /// combined once the outermost delivery returns, so when one publication
    /// reaches both sides only the fully updated pair is emitted.
    pub fn combine_latest<A: 'static, B: 'static>(
        left: &Stream<A>,
        right: &Stream<B>,
        combine: impl Fn(&A, &B) -> T + 'static,
    ) -> Self {
        let left = left.clone();
        let right = right.clone();
        let combine = Rc::new(combine);
        Self::new(move |sink| {
            let state = Rc::new(RefCell::new(CombineState {
                left: None,
                right: None,
                left_ended: false,
                right_ended: false,
                scheduled: false,
            }));
            let emit = {
                let state = Rc::clone(&state);
                let combine = Rc::clone(&combine);
                let sink = sink.clone();
                Rc::new(move || {
                    let combined = {
                        let current = state.borrow();
                        match (&current.left, &current.right) {
                            (Some(left_value), Some(right_value)) => {
                                Some(combine(left_value, right_value))
                            }
                            _ => None,
                        }
                    };
                    if let Some(value) = combined {
                        sink.next(value);
                    }
                })
            };
            let flush: Rc<dyn Fn()> = {
                let state = Rc::clone(&state);
                let emit = Rc::clone(&emit);
                Rc::new(move || {
                    let due = replace(&mut state.borrow_mut().scheduled, false);
                    if due {
                        emit();
                    }
                })
            };
            let request = {
                let state = Rc::clone(&state);
                let flush = Rc::clone(&flush);
                Rc::new(move || {
                    if !batch::is_open() {
                        emit();
                        return;
                    }
                    let already = replace(&mut state.borrow_mut().scheduled, true);
                    if !already {
                        trace!("Deferring combined emission to the end of the batch");
                        batch::defer(Rc::clone(&flush));
                    }
                })
            };

            let left_sub = {
                let state = Rc::clone(&state);
                let request = Rc::clone(&request);
                let flush = Rc::clone(&flush);
                let sink = sink.clone();
                left.subscribe(move |event| match event {
                    Event::Next(value) => {
                        state.borrow_mut().left = Some(value);
                        request();
                    }
                    Event::Failed(error) => sink.fail(error),
                    Event::Ended(reason) => {
                        flush();
                        let exhausted = {
                            let mut current = state.borrow_mut();
                            current.left_ended = true;
                            current.exhausted()
                        };
                        if exhausted {
                            sink.end(reason);
                        }
                    }
                })
            };
            let right_sub = {
                let state = Rc::clone(&state);
                let sink = sink.clone();
                right.subscribe(move |event| match event {
                    Event::Next(value) => {
                        state.borrow_mut().right = Some(value);
                        request();
                    }
                    Event::Failed(error) => sink.fail(error),
                    Event::Ended(reason) => {
                        flush();
                        let exhausted = {
                            let mut current = state.borrow_mut();
                            current.right_ended = true;
                            current.exhausted()
                        };
                        if exhausted {
                            sink.end(reason);
                        }
                    }
                })
            };
            Subscription::all(vec![left_sub, right_sub])
        })
    }
}
