//! Partial-selector queries.

use crate::normalize::normalize_part;
use crate::{Selector, SelectorPart, parse_selector};

/// A partial part matched against the *last* part of a selector.
///
/// Unset fields match anything. Classes and qualifiers match when the
/// selector's part carries at least every listed name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SelectorQuery {
    pattern: SelectorPart,
}

impl SelectorQuery {
    /// A query matching every selector.
    pub fn any() -> Self {
        Self::default()
    }

    /// Use the fields of `part` as the query.
    pub fn from_part(part: &SelectorPart) -> Self {
        Self {
            pattern: normalize_part(part),
        }
    }

    /// Whether `part` satisfies every field of this query.
    pub fn matches_part(&self, part: &SelectorPart) -> bool {
        let pattern = &self.pattern;
        field_matches(pattern.namespace.as_ref(), part.namespace.as_ref())
            && field_matches(pattern.element.as_ref(), part.element.as_ref())
            && field_matches(pattern.id.as_ref(), part.id.as_ref())
            && field_matches(pattern.suffix.as_ref(), part.suffix.as_ref())
            && pattern.classes.iter().all(|class| part.classes.contains(class))
            && pattern
                .qualifiers
                .iter()
                .all(|qualifier| part.qualifiers.contains(qualifier))
    }

    /// Whether the last part of `selector` satisfies this query.
    ///
    /// The empty selector is matched as an empty part.
    pub fn matches(&self, selector: &Selector) -> bool {
        let empty = SelectorPart::new();
        self.matches_part(selector.last_part().unwrap_or(&empty))
    }

    /// The normalized pattern.
    pub const fn pattern(&self) -> &SelectorPart {
        &self.pattern
    }
}

fn field_matches(wanted: Option<&String>, actual: Option<&String>) -> bool {
    wanted.is_none_or(|value| actual == Some(value))
}

impl From<SelectorPart> for SelectorQuery {
    fn from(part: SelectorPart) -> Self {
        Self::from_part(&part)
    }
}

impl From<&str> for SelectorQuery {
    /// The last part of the parsed text: `".nested"`, `"li.item"`.
    fn from(text: &str) -> Self {
        parse_selector(text)
            .last_part()
            .map(Self::from_part)
            .unwrap_or_default()
    }
}
