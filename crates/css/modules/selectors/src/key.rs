//! Hop decomposition and child-map keys.
//!
//! Descending one level of the rule tree consumes one *hop*: an optional
//! leading combinator and the part that follows it. The hop, normalized, is
//! the key a child rule is stored under in its parent.

use crate::normalize::normalize;
use crate::{Combinator, Selector, SelectorItem, SelectorPart};
use core::fmt;

/// Key of a child rule relative to its parent.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SelectorKey {
    /// The empty selector: the rule itself.
    SelfKey,
    /// One hop below the parent.
    Hop {
        combinator: Option<Combinator>,
        part: SelectorPart,
    },
}

impl SelectorKey {
    /// The hop as selector items, for appending to a parent path.
    pub fn to_selector(&self) -> Selector {
        match self {
            Self::SelfKey => Selector::empty(),
            Self::Hop { combinator, part } => {
                let mut items = Vec::with_capacity(2);
                if let Some(combinator) = combinator {
                    items.push(SelectorItem::Combinator(*combinator));
                }
                items.push(SelectorItem::Part(part.clone()));
                Selector::new(items)
            }
        }
    }

    /// The part of a hop, `None` for [`SelectorKey::SelfKey`].
    pub const fn part(&self) -> Option<&SelectorPart> {
        match self {
            Self::SelfKey => None,
            Self::Hop { part, .. } => Some(part),
        }
    }
}

impl fmt::Display for SelectorKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&key_text(self))
    }
}

/// Split a selector into its first hop and the remaining tail.
///
/// The input is normalized first. The empty selector yields
/// `(SelectorKey::SelfKey, None)`; otherwise the tail is `None` only when the
/// hop consumed the whole selector.
pub fn first_hop_and_tail(selector: &Selector) -> (SelectorKey, Option<Selector>) {
    split_normalized(&normalize(selector))
}

/// [`first_hop_and_tail`] for a selector known to be normalized.
pub(crate) fn split_normalized(selector: &Selector) -> (SelectorKey, Option<Selector>) {
    let items = selector.items();
    let mut index = 0;
    let mut combinator = None;
    while let Some(SelectorItem::Combinator(found)) = items.get(index) {
        // Normalized input has at most one leading combinator.
        combinator = Some(*found);
        index += 1;
    }
    let Some(SelectorItem::Part(part)) = items.get(index) else {
        return (SelectorKey::SelfKey, None);
    };
    let key = SelectorKey::Hop {
        combinator,
        part: part.clone(),
    };
    let rest = items.get(index + 1..).unwrap_or_default();
    if rest.is_empty() {
        (key, None)
    } else {
        (key, Some(Selector::new(rest.to_vec())))
    }
}

/// Every hop of a selector, in order.
pub fn hops(selector: &Selector) -> Vec<SelectorKey> {
    let mut out = Vec::new();
    let mut remaining = Some(normalize(selector));
    while let Some(current) = remaining {
        let (key, tail) = split_normalized(&current);
        if key != SelectorKey::SelfKey {
            out.push(key);
        }
        remaining = tail;
    }
    out
}

/// Canonical string form of a key.
///
/// Injective: structural delimiters inside names are escaped with `\`, so two
/// different keys never share a text.
pub fn key_text(key: &SelectorKey) -> String {
    let SelectorKey::Hop { combinator, part } = key else {
        return "&".to_owned();
    };
    let mut text = String::new();
    if let Some(combinator) = combinator {
        text.push(combinator.symbol());
    }
    if let Some(namespace) = &part.namespace {
        push_escaped(&mut text, namespace);
        text.push('|');
    }
    if let Some(element) = &part.element {
        push_escaped(&mut text, element);
    }
    if let Some(id) = &part.id {
        text.push('#');
        push_escaped(&mut text, id);
    }
    for class in &part.classes {
        text.push('.');
        push_escaped(&mut text, class);
    }
    for qualifier in &part.qualifiers {
        text.push('[');
        push_escaped(&mut text, qualifier);
        text.push(']');
    }
    if let Some(suffix) = &part.suffix {
        text.push('{');
        push_escaped(&mut text, suffix);
        text.push('}');
    }
    text
}

const DELIMITERS: &[char] = &['\\', '&', '|', '#', '.', '[', ']', '{', '}', '>', '+', '~'];

fn push_escaped(out: &mut String, name: &str) {
    for character in name.chars() {
        if DELIMITERS.contains(&character) {
            out.push('\\');
        }
        out.push(character);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_selector_is_self() {
        assert_eq!(first_hop_and_tail(&Selector::empty()), (SelectorKey::SelfKey, None));
    }

    #[test]
    fn consumes_leading_combinator_and_part() {
        let selector = Selector::from("> .a + .b");
        let (key, tail) = first_hop_and_tail(&selector);
        assert_eq!(
            key,
            SelectorKey::Hop {
                combinator: Some(Combinator::Child),
                part: SelectorPart::class("a"),
            }
        );
        let tail = tail.unwrap_or_default();
        assert_eq!(tail, Selector::from("+ .b"));
        let (next, rest) = first_hop_and_tail(&tail);
        assert_eq!(next.to_selector(), Selector::from("+ .b"));
        assert_eq!(rest, None);
    }

    #[test]
    fn hop_list_covers_selector() {
        let selector = Selector::from("a > b c");
        let keys = hops(&selector);
        assert_eq!(keys.len(), 3);
        let rebuilt = keys
            .iter()
            .fold(Selector::empty(), |acc, key| acc.join(&key.to_selector()));
        assert_eq!(rebuilt, selector);
    }

    #[test]
    fn key_text_escapes_delimiters() {
        let dotted = SelectorKey::Hop {
            combinator: None,
            part: SelectorPart::class("a.b"),
        };
        let split = SelectorKey::Hop {
            combinator: None,
            part: SelectorPart::class("a").with_class("b"),
        };
        assert_eq!(key_text(&dotted), ".a\\.b");
        assert_eq!(key_text(&split), ".a.b");
        assert_ne!(key_text(&dotted), key_text(&split));
        assert_eq!(key_text(&SelectorKey::SelfKey), "&");
    }

    #[test]
    fn key_text_marks_every_field() {
        let key = SelectorKey::Hop {
            combinator: Some(Combinator::SubsequentSibling),
            part: SelectorPart::element("use")
                .with_namespace("svg")
                .with_id("main")
                .with_qualifier(":hover")
                .with_suffix("::after"),
        };
        assert_eq!(key_text(&key), "~svg|use#main[:hover]{::after}");
    }
}
