//! Arena-backed storage of the rule tree.
//!
//! Nodes live in an arena keyed by [`RuleId`]; parent and child relations are
//! ids, so there are no ownership cycles between nodes. Handles ([`Rule`])
//! share the immutable part of a node ([`RuleMeta`]) and look the rest up in
//! the arena on demand.
//!
//! The arena is never borrowed while user code runs: structural operations
//! collect what changed, release the borrow, then end streams and notify
//! hooks.

use crate::config::TreeConfig;
use crate::rule::Rule;
use crate::spec::Spec;
use core::cell::{Cell, RefCell};
use core::fmt;
use css_selectors::{Selector, SelectorKey, first_hop_and_tail};
use indexmap::IndexMap;
use log::{debug, error, trace};
use rustc_hash::FxHashMap;
use std::rc::{Rc, Weak};
use style_stream::{Subject, Subscription};

/// Stable identity of a rule within its tree. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(u64);

impl RuleId {
    /// The root of every tree.
    pub const ROOT: Self = Self(0);

    /// The raw identifier.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// The part of a node that never changes, shared with every handle.
pub(crate) struct RuleMeta {
    pub(crate) id: RuleId,
    /// Full normalized path from the root.
    pub(crate) selector: Selector,
    /// Key under which the parent stores this rule.
    pub(crate) key: SelectorKey,
    /// Installed specification. Ended when the rule is removed.
    pub(crate) spec: Subject<Spec>,
}

/// Mutable structure of a live node.
struct Node {
    meta: Rc<RuleMeta>,
    parent: Option<RuleId>,
    children: IndexMap<SelectorKey, RuleId>,
}

struct Arena {
    nodes: FxHashMap<RuleId, Node>,
    next_id: u64,
}

impl Arena {
    fn allocate(&mut self) -> RuleId {
        let id = RuleId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Create a child of `parent` under `key`.
    fn insert_child(
        &mut self,
        parent: RuleId,
        key: SelectorKey,
        spec: Spec,
    ) -> Option<Rc<RuleMeta>> {
        let parent_selector = self.nodes.get(&parent)?.meta.selector.clone();
        let id = self.allocate();
        let meta = Rc::new(RuleMeta {
            id,
            selector: parent_selector.join(&key.to_selector()),
            key: key.clone(),
            spec: Subject::with_value(spec),
        });
        let parent_node = self.nodes.get_mut(&parent)?;
        let previous = parent_node.children.insert(key, id);
        if let Some(previous) = previous {
            error!(
                "Child key collision under {}: {previous} replaced by {id}",
                parent_node.meta.selector
            );
        }
        debug_assert!(
            previous.is_none(),
            "duplicate child key under {}",
            parent_node.meta.selector
        );
        self.nodes.insert(
            id,
            Node {
                meta: Rc::clone(&meta),
                parent: Some(parent),
                children: IndexMap::new(),
            },
        );
        Some(meta)
    }

    /// Unlink `id` from its parent and take it and its descendants out of the
    /// arena, in pre-order.
    fn detach(&mut self, id: RuleId) -> Vec<Rc<RuleMeta>> {
        let Some(node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        let key = node.meta.key.clone();
        let parent = node.parent;
        if let Some(parent) = parent.and_then(|parent| self.nodes.get_mut(&parent)) {
            parent.children.shift_remove(&key);
        }
        let mut removed = Vec::new();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let Some(node) = self.nodes.remove(&current) else {
                continue;
            };
            pending.extend(node.children.values().rev().copied());
            removed.push(node.meta);
        }
        removed
    }
}

/// Structural changes delivered to tree hooks, one batch per operation.
#[derive(Default)]
pub(crate) struct TreeChange {
    pub(crate) added: Vec<Rule>,
    pub(crate) removed: Vec<Rule>,
}

impl TreeChange {
    fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Result of copying a subtree, applied once the arena is released.
#[derive(Default)]
struct CopyPlan {
    created: Vec<Rc<RuleMeta>>,
    merges: Vec<(Rc<RuleMeta>, Spec)>,
}

impl CopyPlan {
    /// Merge the copied specifications in. Returns the rules created.
    fn apply(self) -> Vec<Rc<RuleMeta>> {
        for (meta, addendum) in self.merges {
            let current = meta.spec.value().unwrap_or_default();
            meta.spec.set(current.merged_with(addendum));
        }
        self.created
    }
}

type Hook = Rc<dyn Fn(&TreeChange)>;

/// State shared by a tree and all of its rule handles.
pub(crate) struct TreeShared {
    config: TreeConfig,
    root: Rc<RuleMeta>,
    arena: RefCell<Arena>,
    hooks: RefCell<Vec<(u64, Hook)>>,
    next_hook: Cell<u64>,
}

impl TreeShared {
    fn new(config: TreeConfig) -> Rc<Self> {
        let root = Rc::new(RuleMeta {
            id: RuleId::ROOT,
            selector: Selector::empty(),
            key: SelectorKey::SelfKey,
            spec: Subject::with_value(Spec::Empty),
        });
        let mut nodes = FxHashMap::default();
        nodes.insert(
            RuleId::ROOT,
            Node {
                meta: Rc::clone(&root),
                parent: None,
                children: IndexMap::new(),
            },
        );
        Rc::new(Self {
            config,
            root,
            arena: RefCell::new(Arena {
                nodes,
                next_id: RuleId::ROOT.0 + 1,
            }),
            hooks: RefCell::new(Vec::new()),
            next_hook: Cell::new(0),
        })
    }

    pub(crate) const fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub(crate) fn root(&self) -> Rc<RuleMeta> {
        Rc::clone(&self.root)
    }

    pub(crate) fn contains(&self, id: RuleId) -> bool {
        self.arena.borrow().nodes.contains_key(&id)
    }

    pub(crate) fn parent(&self, id: RuleId) -> Option<Rc<RuleMeta>> {
        let arena = self.arena.borrow();
        let parent = arena.nodes.get(&id)?.parent?;
        arena.nodes.get(&parent).map(|node| Rc::clone(&node.meta))
    }

    pub(crate) fn children(&self, id: RuleId) -> Vec<Rc<RuleMeta>> {
        let arena = self.arena.borrow();
        arena.nodes.get(&id).map_or_else(Vec::new, |node| {
            node.children
                .values()
                .filter_map(|child| arena.nodes.get(child))
                .map(|child| Rc::clone(&child.meta))
                .collect()
        })
    }

    /// Every descendant of `id`, in pre-order, excluding `id` itself.
    pub(crate) fn descendants(&self, id: RuleId) -> Vec<Rc<RuleMeta>> {
        let arena = self.arena.borrow();
        let mut out = Vec::new();
        let mut pending: Vec<RuleId> = arena
            .nodes
            .get(&id)
            .map(|node| node.children.values().rev().copied().collect())
            .unwrap_or_default();
        while let Some(current) = pending.pop() {
            if let Some(node) = arena.nodes.get(&current) {
                pending.extend(node.children.values().rev().copied());
                out.push(Rc::clone(&node.meta));
            }
        }
        out
    }

    /// Whether `ancestor` is a strict ancestor of `id`.
    pub(crate) fn is_ancestor(&self, ancestor: RuleId, id: RuleId) -> bool {
        let arena = self.arena.borrow();
        let mut current = arena.nodes.get(&id).and_then(|node| node.parent);
        while let Some(step) = current {
            if step == ancestor {
                return true;
            }
            current = arena.nodes.get(&step).and_then(|node| node.parent);
        }
        false
    }

    /// Follow `selector` down from `start` without creating anything.
    pub(crate) fn find(&self, start: RuleId, selector: &Selector) -> Option<Rc<RuleMeta>> {
        let arena = self.arena.borrow();
        let mut current = start;
        let mut remaining = Some(selector.clone());
        while let Some(step) = remaining {
            let (key, tail) = first_hop_and_tail(&step);
            remaining = tail;
            if key == SelectorKey::SelfKey {
                continue;
            }
            trace!("Looking up hop {key} under {current}");
            current = *arena.nodes.get(&current)?.children.get(&key)?;
        }
        arena.nodes.get(&current).map(|node| Rc::clone(&node.meta))
    }

    /// Follow `selector` down from `start`, creating empty rules for missing
    /// hops. Returns the target and the rules created on the way.
    pub(crate) fn ensure(
        &self,
        start: RuleId,
        selector: &Selector,
    ) -> Option<(Rc<RuleMeta>, Vec<Rc<RuleMeta>>)> {
        let mut arena = self.arena.borrow_mut();
        let mut current = start;
        let mut created = Vec::new();
        let mut remaining = Some(selector.clone());
        while let Some(step) = remaining {
            let (key, tail) = first_hop_and_tail(&step);
            remaining = tail;
            if key == SelectorKey::SelfKey {
                continue;
            }
            trace!("Walking hop {key} under {current}");
            let existing = arena.nodes.get(&current)?.children.get(&key).copied();
            current = match existing {
                Some(child) => child,
                None => {
                    let meta = arena.insert_child(current, key, Spec::Empty)?;
                    debug!("[{}] Created rule {}", self.config.label(), meta.selector);
                    let id = meta.id;
                    created.push(meta);
                    id
                }
            };
        }
        let target = arena.nodes.get(&current).map(|node| Rc::clone(&node.meta))?;
        Some((target, created))
    }

    /// Take `id` and its descendants out of the tree.
    pub(crate) fn detach(&self, id: RuleId) -> Vec<Rc<RuleMeta>> {
        self.arena.borrow_mut().detach(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.arena.borrow().nodes.len()
    }

    /// Register a structural hook. Dropping the guard unregisters it.
    pub(crate) fn add_hook(self: &Rc<Self>, hook: Hook) -> Subscription {
        let id = self.next_hook.get();
        self.next_hook.set(id.saturating_add(1));
        self.hooks.borrow_mut().push((id, hook));
        trace!("[{}] Installed tree hook {id}", self.config.label());
        let weak: Weak<Self> = Rc::downgrade(self);
        Subscription::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.hooks.borrow_mut().retain(|(hook_id, _)| *hook_id != id);
                trace!("[{}] Released tree hook {id}", shared.config.label());
            }
        })
    }

    pub(crate) fn hook_count(&self) -> usize {
        self.hooks.borrow().len()
    }

    /// Deliver `change` to every hook registered at call time.
    pub(crate) fn notify(&self, change: &TreeChange) {
        if change.is_empty() {
            return;
        }
        let hooks: Vec<Hook> = self
            .hooks
            .borrow()
            .iter()
            .map(|(_, hook)| Rc::clone(hook))
            .collect();
        for hook in hooks {
            hook(change);
        }
    }

    /// Copy the subtree at `source_id` of `source` (including the node
    /// itself) onto `target_id` of `target`.
    ///
    /// Missing nodes are created empty; existing children of the target are
    /// kept. The returned plan carries the specifications still to merge.
    fn copy_structure(
        source: &Self,
        source_id: RuleId,
        target: &Self,
        target_id: RuleId,
    ) -> CopyPlan {
        let blueprint = source.blueprint(source_id);
        let mut arena = target.arena.borrow_mut();
        let mut mapping: FxHashMap<RuleId, RuleId> = FxHashMap::default();
        let mut plan = CopyPlan::default();
        for (source_node, parent, meta) in blueprint {
            let copied = match parent {
                None => target_id,
                Some(parent) => {
                    let Some(parent) = mapping.get(&parent).copied() else {
                        continue;
                    };
                    let existing = arena
                        .nodes
                        .get(&parent)
                        .and_then(|node| node.children.get(&meta.key).copied());
                    match existing {
                        Some(id) => id,
                        None => {
                            let created =
                                arena.insert_child(parent, meta.key.clone(), Spec::Empty);
                            let Some(created) = created else {
                                continue;
                            };
                            let id = created.id;
                            plan.created.push(created);
                            id
                        }
                    }
                }
            };
            mapping.insert(source_node, copied);
            let spec = meta.spec.value().unwrap_or_default();
            if let Some(node) = arena.nodes.get(&copied)
                && !spec.is_empty()
            {
                plan.merges.push((Rc::clone(&node.meta), spec));
            }
        }
        plan
    }

    /// Pre-order listing of the subtree at `id`: node, parent, shared meta.
    fn blueprint(&self, id: RuleId) -> Vec<(RuleId, Option<RuleId>, Rc<RuleMeta>)> {
        let arena = self.arena.borrow();
        let mut out = Vec::new();
        let mut pending = vec![(id, None)];
        while let Some((current, parent)) = pending.pop() {
            if let Some(node) = arena.nodes.get(&current) {
                pending.extend(node.children.values().rev().map(|child| (*child, Some(current))));
                out.push((current, parent, Rc::clone(&node.meta)));
            }
        }
        out
    }
}

/// An independent rule tree.
///
/// Every tree owns its root; there is no process-wide state, so any number of
/// trees can coexist.
#[derive(Clone)]
pub struct RuleTree {
    shared: Rc<TreeShared>,
}

impl Default for RuleTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RuleTree {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RuleTree")
            .field("label", &self.shared.config.label())
            .field("rules", &self.shared.len())
            .finish_non_exhaustive()
    }
}

impl RuleTree {
    /// A tree with the default configuration.
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    pub(crate) fn from_shared(shared: &Rc<TreeShared>) -> Self {
        Self {
            shared: Rc::clone(shared),
        }
    }

    pub fn with_config(config: TreeConfig) -> Self {
        debug!("[{}] Created rule tree", config.label());
        Self {
            shared: TreeShared::new(config),
        }
    }

    /// The root rule. Its selector is empty.
    pub fn root(&self) -> Rule {
        Rule::root_of(&self.shared)
    }

    pub fn config(&self) -> &TreeConfig {
        self.shared.config()
    }

    /// Number of rules, including the root.
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Whether the tree holds only its root.
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }

    /// Deep copy of the whole tree.
    ///
    /// The copy has the same shape and specifications but shares no nodes
    /// with this tree: adding, setting or removing rules in one is never
    /// visible in the other.
    pub fn fork(&self) -> Self {
        let fork = Self::with_config(self.shared.config.clone());
        let copied =
            TreeShared::copy_structure(&self.shared, RuleId::ROOT, &fork.shared, RuleId::ROOT)
                .apply();
        debug!(
            "[{}] Forked {} rules below the root",
            self.shared.config.label(),
            copied.len()
        );
        fork
    }

    /// Number of structural hooks currently installed by live views.
    pub fn tracking_views(&self) -> usize {
        self.shared.hook_count()
    }
}

/// Graft the subtree at `source` onto `target`. Returns the rules created.
pub(crate) fn graft(source: &Rule, target: &Rule) -> Vec<Rc<RuleMeta>> {
    TreeShared::copy_structure(source.shared(), source.id(), target.shared(), target.id())
        .apply()
}
