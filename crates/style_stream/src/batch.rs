//! Delivery batches.
//!
//! Every [`Subject`](crate::Subject) pushes its updates inside a batch.
//! Operators that join several upstreams defer their emission to the end of
//! the outermost batch, so a value reaching both sides of a join in one call
//! stack is seen downstream only once both sides have it.

use core::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

type Task = Rc<dyn Fn()>;

struct Batch {
    depth: Cell<usize>,
    deferred: RefCell<VecDeque<Task>>,
}

thread_local! {
    static BATCH: Batch = const {
        Batch {
            depth: Cell::new(0),
            deferred: RefCell::new(VecDeque::new()),
        }
    };
}

/// Keeps the batch open while alive.
struct Open;

impl Open {
    fn enter() -> Self {
        BATCH.with(|batch| batch.depth.set(batch.depth.get().saturating_add(1)));
        Self
    }
}

impl Drop for Open {
    fn drop(&mut self) {
        BATCH.with(|batch| batch.depth.set(batch.depth.get().saturating_sub(1)));
    }
}

/// Run `deliver` inside a batch. Leaving the outermost batch runs every
/// deferred task, in the order they were deferred.
pub(crate) fn within(deliver: impl FnOnce()) {
    {
        let _open = Open::enter();
        deliver();
    }
    if !is_open() {
        flush();
    }
}

/// Whether a delivery is in progress on this thread.
pub(crate) fn is_open() -> bool {
    BATCH.with(|batch| batch.depth.get() > 0)
}

/// Run `task` once the outermost batch is left.
pub(crate) fn defer(task: Task) {
    BATCH.with(|batch| batch.deferred.borrow_mut().push_back(task));
}

fn flush() {
    loop {
        let next = BATCH.with(|batch| batch.deferred.borrow_mut().pop_front());
        let Some(task) = next else {
            return;
        };
        let _open = Open::enter();
        task();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deferred_tasks_run_after_the_outermost_batch() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let outer_log = Rc::clone(&log);
        within(move || {
            let inner_log = Rc::clone(&outer_log);
            within(move || {
                let task_log = Rc::clone(&inner_log);
                defer(Rc::new(move || task_log.borrow_mut().push("deferred")));
                inner_log.borrow_mut().push("inner");
            });
            outer_log.borrow_mut().push("outer");
        });
        assert_eq!(*log.borrow(), vec!["inner", "outer", "deferred"]);
        assert!(!is_open());
    }

    #[test]
    fn tasks_deferred_while_flushing_run_in_the_same_flush() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let outer_log = Rc::clone(&log);
        within(move || {
            let first_log = Rc::clone(&outer_log);
            defer(Rc::new(move || {
                first_log.borrow_mut().push(1);
                let second_log = Rc::clone(&first_log);
                defer(Rc::new(move || second_log.borrow_mut().push(2)));
            }));
        });
        assert_eq!(*log.borrow(), vec![1, 2]);
    }
}
