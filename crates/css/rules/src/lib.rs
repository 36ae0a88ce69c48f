//! Reactive style rule tree.
//!
//! Rules are addressed by selectors and nest the way the selectors do: the
//! rule for `.a > .b` is the child `> .b` of the rule `.a`. Each rule holds a
//! property specification; reading a rule resolves that specification into a
//! stream of property maps that follows every later change.
//!
//! ```text
//! RuleTree
//!   └─ root (empty selector)
//!        └─ .a                  add_rule(".a", …)
//!             └─ > .b           add_rule(".a > .b", …)
//!                                    │
//!                     read() ──▶ Stream<PropertyMap>
//! ```
//!
//! Adding to a rule merges the new properties over the existing ones: the
//! later declaration wins unless the earlier one has a strictly higher
//! priority (`!important`).
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use css_rules::RuleTree;
//! use style_stream::Event;
//!
//! let tree = RuleTree::new();
//! let button = tree.root().add_rule("button.primary", [("color", "red !important")]);
//! button.add([("color", "blue"), ("margin", "0")]);
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! let _sub = button.read().subscribe(move |event| {
//!     if let Event::Next(map) = event {
//!         let color = map.get("color").map(ToString::to_string);
//!         sink.borrow_mut().push(color);
//!     }
//! });
//! assert_eq!(*seen.borrow(), vec![Some("red !important".to_owned())]);
//! ```

#![forbid(unsafe_code)]
#![allow(
    clippy::module_name_repetitions,
    reason = "RuleTree and RuleList read better than Tree and List"
)]
#![allow(clippy::redundant_pub_crate, reason = "Tree internals are shared across modules")]
#![allow(
    clippy::return_self_not_must_use,
    reason = "Mutators return the rule for chaining and are mostly called for effect"
)]

mod config;
mod list;
mod merge;
mod rule;
mod spec;
mod tree;

// Re-exports
pub use config::{DEFAULT_RAW_TEXT_KEY, TreeConfig};
pub use list::{RuleList, RuleListDelta};
pub use merge::{merge, normalize_spec, suppress_duplicates};
pub use rule::{Rule, WeakRule};
pub use spec::{DeriveFn, Spec};
pub use tree::{RuleId, RuleTree};

pub use css_cascade::{Priority, PropertyMap, PropertyValue};
pub use css_selectors::{Selector, SelectorQuery};
