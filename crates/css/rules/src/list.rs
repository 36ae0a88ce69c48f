//! Live views over sets of rules.
//!
//! A [`RuleList`] keeps a snapshot of the rules it covers and, while at least
//! one observer is subscribed, keeps that snapshot in step with the tree:
//!
//! ```text
//! tree mutation ──hook──▶ subtree / children view ──delta──▶ grab(query) view
//!                                                  ──delta──▶ observers
//! ```
//!
//! Without observers nothing is tracked and the snapshot stays as it was
//! last known. The next first subscriber brings it up to date and receives
//! the difference as one catch-up delta.

use crate::rule::Rule;
use crate::tree::{RuleId, TreeChange};
use core::cell::{Cell, RefCell};
use core::fmt;
use css_selectors::SelectorQuery;
use indexmap::IndexMap;
use log::trace;
use std::rc::Rc;
use style_stream::Subscription;

/// Rules that entered and left a view in one update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuleListDelta {
    pub added: Vec<Rule>,
    pub removed: Vec<Rule>,
}

impl RuleListDelta {
    /// Whether nothing was added or removed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

enum ListSource {
    /// Every rule below a rule.
    Subtree(Rule),
    /// Immediate children of a rule.
    Children(Rule),
    /// The rules of another view whose last part matches.
    Filter { parent: RuleList, query: SelectorQuery },
}

type Observer = Rc<dyn Fn(&RuleListDelta)>;

struct ListInner {
    source: ListSource,
    snapshot: RefCell<IndexMap<RuleId, Rule>>,
    observers: RefCell<Vec<(u64, Observer)>>,
    next_observer: Cell<u64>,
    /// Hook on the tree or subscription to the parent view, while observed.
    tracking: RefCell<Option<Subscription>>,
}

impl ListInner {
    /// Current members, computed from the source rather than the snapshot.
    fn compute(&self) -> Vec<Rule> {
        match &self.source {
            ListSource::Subtree(rule) => rule
                .shared()
                .descendants(rule.id())
                .into_iter()
                .map(|meta| Rule::from_meta(rule.shared(), meta))
                .collect(),
            ListSource::Children(rule) => rule.children(),
            ListSource::Filter { parent, query } => parent
                .inner
                .compute()
                .into_iter()
                .filter(|rule| query.matches(rule.selector()))
                .collect(),
        }
    }

    /// Whether a rule just added to the tree belongs to this view.
    fn covers(&self, rule: &Rule) -> bool {
        match &self.source {
            ListSource::Subtree(source) => {
                Rc::ptr_eq(source.shared(), rule.shared())
                    && source.shared().is_ancestor(source.id(), rule.id())
            }
            ListSource::Children(source) => rule.parent().is_some_and(|parent| parent == *source),
            ListSource::Filter { query, .. } => query.matches(rule.selector()),
        }
    }

    /// Replace the snapshot with `fresh`. Returns what changed.
    fn resync(&self, fresh: Vec<Rule>) -> RuleListDelta {
        let mut snapshot = self.snapshot.borrow_mut();
        let next: IndexMap<RuleId, Rule> =
            fresh.into_iter().map(|rule| (rule.id(), rule)).collect();
        let removed = snapshot
            .values()
            .filter(|rule| !next.contains_key(&rule.id()))
            .cloned()
            .collect();
        let added = next
            .values()
            .filter(|rule| !snapshot.contains_key(&rule.id()))
            .cloned()
            .collect();
        *snapshot = next;
        RuleListDelta { added, removed }
    }

    /// Apply candidate changes to the snapshot and forward the ones that
    /// actually changed it.
    fn apply(&self, added: Vec<Rule>, removed: Vec<Rule>) {
        let mut delta = RuleListDelta::default();
        {
            let mut snapshot = self.snapshot.borrow_mut();
            for rule in removed {
                if snapshot.shift_remove(&rule.id()).is_some() {
                    delta.removed.push(rule);
                }
            }
            for rule in added {
                if !snapshot.contains_key(&rule.id()) {
                    snapshot.insert(rule.id(), rule.clone());
                    delta.added.push(rule);
                }
            }
        }
        self.deliver(&delta);
    }

    fn on_tree_change(&self, change: &TreeChange) {
        let added = change
            .added
            .iter()
            .filter(|rule| self.covers(rule))
            .cloned()
            .collect();
        self.apply(added, change.removed.clone());
    }

    fn on_parent_delta(&self, delta: &RuleListDelta) {
        let added = delta
            .added
            .iter()
            .filter(|rule| self.covers(rule))
            .cloned()
            .collect();
        self.apply(added, delta.removed.clone());
    }

    fn deliver(&self, delta: &RuleListDelta) {
        if delta.is_empty() {
            return;
        }
        trace!(
            "View delivers {} added and {} removed rules",
            delta.added.len(),
            delta.removed.len()
        );
        let observers: Vec<Observer> = self
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| Rc::clone(observer))
            .collect();
        for observer in observers {
            observer(delta);
        }
    }

    /// Bring the snapshot up to date and follow the source from now on.
    fn start(inner: &Rc<Self>) {
        let catch_up = inner.resync(inner.compute());
        let weak = Rc::downgrade(inner);
        let guard = match &inner.source {
            ListSource::Subtree(rule) | ListSource::Children(rule) => {
                rule.shared().add_hook(Rc::new(move |change: &TreeChange| {
                    if let Some(list) = weak.upgrade() {
                        list.on_tree_change(change);
                    }
                }))
            }
            ListSource::Filter { parent, .. } => parent.subscribe(move |delta| {
                if let Some(list) = weak.upgrade() {
                    list.on_parent_delta(delta);
                }
            }),
        };
        trace!("View started tracking");
        *inner.tracking.borrow_mut() = Some(guard);
        inner.deliver(&catch_up);
    }

    fn stop(&self) {
        let guard = self.tracking.borrow_mut().take();
        if guard.is_some() {
            trace!("View stopped tracking");
        }
        drop(guard);
    }
}

/// A live, ordered set of rules.
///
/// Cloning shares the view. Views are created by [`Rule::rules`],
/// [`Rule::nested`] and [`RuleList::grab`].
#[derive(Clone)]
pub struct RuleList {
    inner: Rc<ListInner>,
}

impl RuleList {
    fn new(source: ListSource) -> Self {
        let inner = Rc::new(ListInner {
            source,
            snapshot: RefCell::new(IndexMap::new()),
            observers: RefCell::new(Vec::new()),
            next_observer: Cell::new(0),
            tracking: RefCell::new(None),
        });
        let initial: IndexMap<RuleId, Rule> = inner
            .compute()
            .into_iter()
            .map(|rule| (rule.id(), rule))
            .collect();
        *inner.snapshot.borrow_mut() = initial;
        Self { inner }
    }

    pub(crate) fn subtree(rule: &Rule) -> Self {
        Self::new(ListSource::Subtree(rule.clone()))
    }

    pub(crate) fn children(rule: &Rule) -> Self {
        Self::new(ListSource::Children(rule.clone()))
    }

    /// A live view of the rules of this view whose last selector part
    /// matches `query`.
    pub fn grab(&self, query: impl Into<SelectorQuery>) -> Self {
        Self::new(ListSource::Filter {
            parent: self.clone(),
            query: query.into(),
        })
    }

    /// Follow changes to this view.
    ///
    /// The first observer starts tracking; if the snapshot went stale while
    /// nobody was subscribed, the observer receives the difference right
    /// away. Dropping the last subscription stops tracking.
    pub fn subscribe(&self, observer: impl Fn(&RuleListDelta) + 'static) -> Subscription {
        let id = self.inner.next_observer.get();
        self.inner.next_observer.set(id.saturating_add(1));
        self.inner
            .observers
            .borrow_mut()
            .push((id, Rc::new(observer)));
        if self.inner.tracking.borrow().is_none() {
            ListInner::start(&self.inner);
        }
        let inner = Rc::clone(&self.inner);
        Subscription::new(move || {
            let idle = {
                let mut observers = inner.observers.borrow_mut();
                observers.retain(|(observer_id, _)| *observer_id != id);
                observers.is_empty()
            };
            if idle {
                inner.stop();
            }
        })
    }

    /// Whether the view currently follows its source.
    pub fn is_tracking(&self) -> bool {
        self.inner.tracking.borrow().is_some()
    }

    /// Snapshot of the members, in order.
    pub fn to_vec(&self) -> Vec<Rule> {
        self.inner.snapshot.borrow().values().cloned().collect()
    }

    /// Iterate over a snapshot of the members.
    pub fn iter(&self) -> impl Iterator<Item = Rule> {
        self.to_vec().into_iter()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.inner.snapshot.borrow().len()
    }

    /// Whether the list has no members.
    pub fn is_empty(&self) -> bool {
        self.inner.snapshot.borrow().is_empty()
    }

    /// Whether `rule` is currently a member.
    pub fn contains(&self, rule: &Rule) -> bool {
        self.inner
            .snapshot
            .borrow()
            .get(&rule.id())
            .is_some_and(|member| member == rule)
    }
}

impl fmt::Debug for RuleList {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RuleList")
            .field("rules", &self.len())
            .field("tracking", &self.is_tracking())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RuleTree, Spec};

    #[test]
    fn snapshot_is_taken_at_creation() {
        let tree = RuleTree::new();
        let root = tree.root();
        root.add_rule(".a .b", Spec::Empty);
        let rules = root.rules();
        assert_eq!(rules.len(), 2);
        assert!(!rules.is_tracking());
        root.add_rule(".c", Spec::Empty);
        assert_eq!(rules.len(), 2);
        assert_eq!(root.rules().len(), 3);
    }

    #[test]
    fn nested_covers_only_children() {
        let tree = RuleTree::new();
        let root = tree.root();
        let first = root.add_rule(".a", Spec::Empty);
        root.add_rule(".a .b", Spec::Empty);
        let nested = root.nested();
        assert_eq!(nested.to_vec(), vec![first]);
    }
}
