//! Rule handles.

use crate::config::TreeConfig;
use crate::list::RuleList;
use crate::merge::normalize_spec;
use crate::spec::Spec;
use crate::tree::{RuleId, RuleMeta, RuleTree, TreeChange, TreeShared, graft};
use core::fmt;
use core::hash::{Hash, Hasher};
use css_cascade::PropertyMap;
use css_selectors::{Selector, SelectorKey};
use log::{debug, trace, warn};
use std::rc::{Rc, Weak};
use style_stream::Stream;

/// Handle to one rule of a [`RuleTree`].
///
/// Handles are cheap to clone and compare by identity. A handle stays valid
/// after its rule is removed: structural queries keep answering from the
/// removed rule's last state, mutations become no-ops and [`Rule::read`]
/// returns a stream that has already ended.
#[derive(Clone)]
pub struct Rule {
    shared: Rc<TreeShared>,
    meta: Rc<RuleMeta>,
}

impl Rule {
    pub(crate) fn root_of(shared: &Rc<TreeShared>) -> Self {
        Self::from_meta(shared, shared.root())
    }

    pub(crate) fn from_meta(shared: &Rc<TreeShared>, meta: Rc<RuleMeta>) -> Self {
        Self {
            shared: Rc::clone(shared),
            meta,
        }
    }

    pub(crate) fn shared(&self) -> &Rc<TreeShared> {
        &self.shared
    }

    /// Identity of this rule, never reused within its tree.
    pub fn id(&self) -> RuleId {
        self.meta.id
    }

    /// Full normalized path from the root.
    pub fn selector(&self) -> &Selector {
        &self.meta.selector
    }

    /// Key under which the parent stores this rule.
    pub fn key(&self) -> &SelectorKey {
        &self.meta.key
    }

    /// The tree this rule belongs to.
    pub fn tree(&self) -> RuleTree {
        RuleTree::from_shared(&self.shared)
    }

    /// Configuration of the owning tree.
    pub fn tree_config(&self) -> &TreeConfig {
        self.shared.config()
    }

    /// The root of this rule's tree.
    pub fn root(&self) -> Self {
        Self::root_of(&self.shared)
    }

    /// Whether this is the tree's root rule.
    pub fn is_root(&self) -> bool {
        self.meta.id == RuleId::ROOT
    }

    /// `None` for the root and for removed rules.
    pub fn parent(&self) -> Option<Self> {
        self.shared
            .parent(self.id())
            .map(|meta| Self::from_meta(&self.shared, meta))
    }

    /// Immediate children in creation order.
    pub fn children(&self) -> Vec<Self> {
        self.shared
            .children(self.id())
            .into_iter()
            .map(|meta| Self::from_meta(&self.shared, meta))
            .collect()
    }

    /// The installed specification.
    pub fn spec(&self) -> Spec {
        self.meta.spec.value().unwrap_or_default()
    }

    /// Whether the rule resolves to no properties for sure: nothing is
    /// installed, or the rule was removed.
    pub fn is_empty(&self) -> bool {
        self.is_removed() || self.spec().is_empty()
    }

    pub fn is_removed(&self) -> bool {
        !self.shared.contains(self.id())
    }

    /// The resolved, duplicate-suppressed properties of this rule.
    ///
    /// Each subscription resolves the specification afresh and follows every
    /// later [`Rule::set`] or [`Rule::add`]. Removing the rule ends the stream
    /// with the removal reason.
    pub fn read(&self) -> Stream<PropertyMap> {
        let owner = self.downgrade();
        self.meta
            .spec
            .stream()
            .switch_map(move |spec| {
                owner.upgrade().map_or_else(
                    || Stream::ended(Some("rule tree dropped".to_owned())),
                    |rule| normalize_spec(&rule, &spec),
                )
            })
            .distinct_by(PropertyMap::same_as)
    }

    /// Live view of every rule below this one.
    pub fn rules(&self) -> RuleList {
        RuleList::subtree(self)
    }

    /// Live view of the immediate children of this rule.
    pub fn nested(&self) -> RuleList {
        RuleList::children(self)
    }

    /// Look up the rule at `selector` relative to this one.
    pub fn rule(&self, selector: impl Into<Selector>) -> Option<Self> {
        let selector = selector.into();
        self.shared
            .find(self.id(), &selector)
            .map(|meta| Self::from_meta(&self.shared, meta))
    }

    /// Merge `spec` over the installed specification.
    pub fn add(&self, spec: impl Into<Spec>) -> Self {
        if self.rejects_mutation("add") {
            return self.clone();
        }
        let spec = spec.into();
        if spec.is_empty() {
            return self.clone();
        }
        trace!("Adding {spec:?} to {}", self.selector());
        self.meta.spec.set(self.spec().merged_with(spec));
        self.clone()
    }

    /// Replace the installed specification. [`Spec::Empty`] clears the rule.
    pub fn set(&self, spec: impl Into<Spec>) -> Self {
        if self.rejects_mutation("set") {
            return self.clone();
        }
        let spec = spec.into();
        trace!("Setting {} to {spec:?}", self.selector());
        self.meta.spec.set(spec);
        self.clone()
    }

    /// Clear back to an empty rule.
    pub fn clear(&self) -> Self {
        self.set(Spec::Empty)
    }

    /// Find or create the rule at `selector` below this one and merge `spec`
    /// into it. Missing intermediate rules are created empty.
    pub fn add_rule(&self, selector: impl Into<Selector>, spec: impl Into<Spec>) -> Self {
        if self.rejects_mutation("add_rule") {
            return self.clone();
        }
        let selector = selector.into();
        let Some((target, created)) = self.shared.ensure(self.id(), &selector) else {
            warn!("Could not reach {selector} below {}", self.selector());
            return self.clone();
        };
        let target = Self::from_meta(&self.shared, target).add(spec);
        self.announce_added(created);
        target
    }

    /// Remove this rule and everything below it.
    ///
    /// Every removed rule's stream ends with `reason`. Removing the root or an
    /// already removed rule does nothing.
    pub fn remove(&self, reason: Option<&str>) -> Self {
        if self.is_root() {
            trace!("Ignoring removal of the root");
            return self.clone();
        }
        let removed = self.shared.detach(self.id());
        if removed.is_empty() {
            trace!("{} is already removed", self.selector());
            return self.clone();
        }
        debug!(
            "[{}] Removed {} with {} rules below",
            self.tree_config().label(),
            self.selector(),
            removed.len() - 1
        );
        let reason = reason.map(str::to_owned);
        for meta in &removed {
            meta.spec.end(reason.clone());
        }
        self.shared.notify(&TreeChange {
            added: Vec::new(),
            removed: removed
                .into_iter()
                .map(|meta| Self::from_meta(&self.shared, meta))
                .collect(),
        });
        self.clone()
    }

    /// Copy `prototype` and everything below it onto this rule.
    ///
    /// Specifications are merged over the ones already installed, missing
    /// rules are created, and rules this one already has are kept. The copy
    /// is independent: later changes to the prototype do not show up here.
    pub fn extend(&self, prototype: &Self) -> Self {
        if self.rejects_mutation("extend") {
            return self.clone();
        }
        if prototype.is_removed() {
            warn!("Ignoring extension of {} by a removed rule", self.selector());
            return self.clone();
        }
        let created = graft(prototype, self);
        debug!(
            "[{}] Extended {} by {}, {} rules created",
            self.tree_config().label(),
            self.selector(),
            prototype.selector(),
            created.len()
        );
        self.announce_added(created);
        self.clone()
    }

    /// A handle that does not keep the tree alive.
    pub fn downgrade(&self) -> WeakRule {
        WeakRule {
            shared: Rc::downgrade(&self.shared),
            meta: Rc::downgrade(&self.meta),
        }
    }

    fn announce_added(&self, created: Vec<Rc<RuleMeta>>) {
        if created.is_empty() {
            return;
        }
        self.shared.notify(&TreeChange {
            added: created
                .into_iter()
                .map(|meta| Self::from_meta(&self.shared, meta))
                .collect(),
            removed: Vec::new(),
        });
    }

    fn rejects_mutation(&self, operation: &str) -> bool {
        let removed = self.is_removed();
        if removed {
            warn!("Ignoring {operation} on removed rule {}", self.selector());
        }
        removed
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.meta, &other.meta)
    }
}

impl Eq for Rule {}

impl Hash for Rule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.meta.id.hash(state);
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Rule")
            .field("id", &self.meta.id)
            .field("selector", &self.meta.selector.to_string())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.meta.selector)
    }
}

/// Non-owning [`Rule`] handle.
#[derive(Clone)]
pub struct WeakRule {
    shared: Weak<TreeShared>,
    meta: Weak<RuleMeta>,
}

impl WeakRule {
    /// The rule, while its tree is still alive.
    pub fn upgrade(&self) -> Option<Rule> {
        Some(Rule {
            shared: self.shared.upgrade()?,
            meta: self.meta.upgrade()?,
        })
    }
}

impl fmt::Debug for WeakRule {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("WeakRule")
            .field("alive", &(self.meta.strong_count() > 0))
            .finish_non_exhaustive()
    }
}
