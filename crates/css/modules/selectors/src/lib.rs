//! Structured selectors for the style rule tree.
//!
//! A selector is an ordered sequence of [`SelectorItem`]s: parts (namespace,
//! element, id, classes, qualifiers, raw suffix) interleaved with explicit
//! combinators. Two adjacent parts are joined by the descendant combinator.
//!
//! This crate provides:
//! - The selector model and conversions from strings and parts
//! - A permissive string tokenizer ([`parse_selector`])
//! - Canonical normalization ([`normalize`])
//! - Hop decomposition and child-map keys ([`first_hop_and_tail`], [`key_text`])
//! - Partial-selector queries over a selector's last part ([`SelectorQuery`])
//!
//! Combinators: <https://www.w3.org/TR/selectors-4/#combinators>

#![forbid(unsafe_code)]
#![allow(
    clippy::module_name_repetitions,
    reason = "SelectorKey and SelectorQuery are clearer than Key and Query"
)]
#![allow(clippy::redundant_pub_crate, reason = "Crate-internal helpers are marked explicitly")]

mod key;
mod normalize;
mod parser;
mod query;

use core::fmt;
use smallvec::SmallVec;

// Re-export public API
pub use key::{SelectorKey, first_hop_and_tail, hops, key_text};
pub use normalize::{is_normalized, normalize};
pub use parser::parse_selector;
pub use query::SelectorQuery;

/// Sorted, deduplicated name list of a part (classes or qualifiers).
pub type NameList = SmallVec<String, 2>;

/// One compound segment of a selector. All fields are optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SelectorPart {
    /// Namespace prefix (`svg|`).
    pub namespace: Option<String>,
    /// Element (type) name, `*` for universal.
    pub element: Option<String>,
    /// Id without the leading `#`.
    pub id: Option<String>,
    /// Class names without the leading `.`.
    pub classes: NameList,
    /// Pseudo-classes and attribute tests, kept verbatim (`:hover`, `[type=text]`).
    pub qualifiers: NameList,
    /// Raw trailing text such as a pseudo-element (`::before`).
    pub suffix: Option<String>,
}

impl SelectorPart {
    /// A part with no fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// A part matching an element name.
    pub fn element(name: impl Into<String>) -> Self {
        Self::new().with_element(name)
    }

    /// A part matching a single class.
    pub fn class(name: impl Into<String>) -> Self {
        Self::new().with_class(name)
    }

    /// A part matching an id.
    pub fn id(name: impl Into<String>) -> Self {
        Self::new().with_id(name)
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    #[must_use]
    pub fn with_element(mut self, name: impl Into<String>) -> Self {
        self.element = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_class(mut self, name: impl Into<String>) -> Self {
        self.classes.push(name.into());
        self
    }

    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifiers.push(qualifier.into());
        self
    }

    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// True when no field carries anything.
    pub fn is_empty(&self) -> bool {
        self.namespace.as_deref().is_none_or(str::is_empty)
            && self.element.as_deref().is_none_or(str::is_empty)
            && self.id.as_deref().is_none_or(str::is_empty)
            && self.classes.iter().all(String::is_empty)
            && self.qualifiers.iter().all(String::is_empty)
            && self.suffix.as_deref().is_none_or(str::is_empty)
    }
}

/// Explicit combinators. The descendant combinator is implicit between parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Combinator {
    /// `>`
    Child,
    /// `+`
    NextSibling,
    /// `~`
    SubsequentSibling,
}

impl Combinator {
    /// The CSS symbol for this combinator.
    pub const fn symbol(self) -> char {
        match self {
            Self::Child => '>',
            Self::NextSibling => '+',
            Self::SubsequentSibling => '~',
        }
    }

    /// Parse a combinator symbol.
    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '>' => Some(Self::Child),
            '+' => Some(Self::NextSibling),
            '~' => Some(Self::SubsequentSibling),
            _ => None,
        }
    }
}

/// One element of a selector sequence.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SelectorItem {
    Part(SelectorPart),
    Combinator(Combinator),
}

impl SelectorItem {
    /// The part, if this item is one.
    pub const fn as_part(&self) -> Option<&SelectorPart> {
        match self {
            Self::Part(part) => Some(part),
            Self::Combinator(_) => None,
        }
    }

    /// Whether this item is a combinator.
    pub const fn is_combinator(&self) -> bool {
        matches!(self, Self::Combinator(_))
    }
}

impl From<SelectorPart> for SelectorItem {
    fn from(part: SelectorPart) -> Self {
        Self::Part(part)
    }
}

impl From<Combinator> for SelectorItem {
    fn from(combinator: Combinator) -> Self {
        Self::Combinator(combinator)
    }
}

/// An ordered sequence of parts and combinators.
///
/// Values built through the `From` conversions of this crate are already
/// normalized; [`Selector::new`] keeps the items verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Selector {
    items: Vec<SelectorItem>,
}

impl Selector {
    /// Wrap items as given, without normalizing.
    pub const fn new(items: Vec<SelectorItem>) -> Self {
        Self { items }
    }

    /// The empty selector, addressing a rule itself.
    pub const fn empty() -> Self {
        Self { items: Vec::new() }
    }

    /// The items in order.
    pub fn items(&self) -> &[SelectorItem] {
        &self.items
    }

    /// Unwrap into the items.
    pub fn into_items(self) -> Vec<SelectorItem> {
        self.items
    }

    /// Whether the selector addresses the rule itself.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items, combinators included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// The last part: the segment a rule's own element is matched by.
    pub fn last_part(&self) -> Option<&SelectorPart> {
        self.items.iter().rev().find_map(SelectorItem::as_part)
    }

    /// This selector followed by `tail`, without renormalizing.
    #[must_use]
    pub fn join(&self, tail: &Self) -> Self {
        let mut items = Vec::with_capacity(self.items.len() + tail.items.len());
        items.extend(self.items.iter().cloned());
        items.extend(tail.items.iter().cloned());
        Self { items }
    }

    /// Whether `prefix` is a leading subsequence of this selector.
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.items.starts_with(&prefix.items)
    }
}

impl From<Vec<SelectorItem>> for Selector {
    fn from(items: Vec<SelectorItem>) -> Self {
        normalize(&Self::new(items))
    }
}

impl From<SelectorPart> for Selector {
    fn from(part: SelectorPart) -> Self {
        normalize(&Self::new(vec![SelectorItem::Part(part)]))
    }
}

impl From<Combinator> for Selector {
    fn from(combinator: Combinator) -> Self {
        normalize(&Self::new(vec![SelectorItem::Combinator(combinator)]))
    }
}

impl From<&str> for Selector {
    fn from(text: &str) -> Self {
        parse_selector(text)
    }
}

impl From<String> for Selector {
    fn from(text: String) -> Self {
        parse_selector(&text)
    }
}

impl From<&Self> for Selector {
    fn from(selector: &Self) -> Self {
        selector.clone()
    }
}

impl<const N: usize> From<[&str; N]> for Selector {
    /// Concatenate parsed pieces: `["x", ">", "y"]` is `x > y`.
    fn from(pieces: [&str; N]) -> Self {
        let items = pieces
            .iter()
            .flat_map(|piece| parse_selector(piece).into_items())
            .collect();
        normalize(&Self::new(items))
    }
}

impl FromIterator<SelectorItem> for Selector {
    fn from_iter<I: IntoIterator<Item = SelectorItem>>(iter: I) -> Self {
        normalize(&Self::new(iter.into_iter().collect()))
    }
}

impl fmt::Display for SelectorPart {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return formatter.write_str("*");
        }
        if let Some(namespace) = &self.namespace {
            write!(formatter, "{namespace}|")?;
        }
        if let Some(element) = &self.element {
            formatter.write_str(element)?;
        }
        if let Some(id) = &self.id {
            write!(formatter, "#{id}")?;
        }
        for class in &self.classes {
            write!(formatter, ".{class}")?;
        }
        for qualifier in &self.qualifiers {
            formatter.write_str(qualifier)?;
        }
        if let Some(suffix) = &self.suffix {
            formatter.write_str(suffix)?;
        }
        Ok(())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for item in &self.items {
            if !first {
                formatter.write_str(" ")?;
            }
            first = false;
            match item {
                SelectorItem::Part(part) => write!(formatter, "{part}")?,
                SelectorItem::Combinator(combinator) => {
                    write!(formatter, "{}", combinator.symbol())?;
                }
            }
        }
        Ok(())
    }
}
