//! Revision tracking for stream updates.
//!
//! A [`Subject`](crate::Subject) stamps every value it publishes with the
//! next revision. `switch_map` stamps its inner subscriptions the same way to
//! tell the current one from a superseded one that is still delivering.

use core::cell::Cell;

/// Point in the update history of a value holder. Larger is more recent.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Revision(u64);

impl Revision {
    /// Nothing published yet.
    pub const INITIAL: Self = Self(0);

    /// The raw revision number.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether this revision is more recent than `other`.
    #[inline]
    pub const fn is_after(self, other: Self) -> bool {
        self.0 > other.0
    }
}

/// Single-threaded revision source.
#[derive(Debug, Default)]
pub struct RevisionCounter {
    latest: Cell<u64>,
}

impl RevisionCounter {
    /// A counter at [`Revision::INITIAL`].
    #[inline]
    pub const fn new() -> Self {
        Self {
            latest: Cell::new(Revision::INITIAL.0),
        }
    }

    /// The last revision handed out.
    #[inline]
    pub fn current(&self) -> Revision {
        Revision(self.latest.get())
    }

    /// Advance by one and return the new revision.
    #[inline]
    pub fn increment(&self) -> Revision {
        let next = self.latest.get().saturating_add(1);
        self.latest.set(next);
        Revision(next)
    }
}
