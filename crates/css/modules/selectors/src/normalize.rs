//! Canonical selector form.
//!
//! A normalized selector has:
//! - no empty fields inside parts, classes and qualifiers sorted and unique
//! - no empty parts, except one between two combinators and one after a
//!   trailing combinator
//!
//! Normalization is idempotent, so normalized selectors can be compared and
//! hashed directly.

use crate::{NameList, Selector, SelectorItem, SelectorPart};

/// Normalize a selector. Pure and total over any input.
pub fn normalize(selector: &Selector) -> Selector {
    let mut items: Vec<SelectorItem> = Vec::with_capacity(selector.len());
    for item in selector.items() {
        match item {
            SelectorItem::Part(part) => {
                let part = normalize_part(part);
                if !part.is_empty() {
                    items.push(SelectorItem::Part(part));
                }
            }
            SelectorItem::Combinator(combinator) => {
                if items.last().is_some_and(SelectorItem::is_combinator) {
                    items.push(SelectorItem::Part(SelectorPart::new()));
                }
                items.push(SelectorItem::Combinator(*combinator));
            }
        }
    }
    if items.last().is_some_and(SelectorItem::is_combinator) {
        items.push(SelectorItem::Part(SelectorPart::new()));
    }
    Selector::new(items)
}

/// Whether `selector` is already in canonical form.
pub fn is_normalized(selector: &Selector) -> bool {
    normalize(selector) == *selector
}

/// Drop empty fields, sort and deduplicate name lists.
pub(crate) fn normalize_part(part: &SelectorPart) -> SelectorPart {
    SelectorPart {
        namespace: non_empty(part.namespace.as_deref()),
        element: non_empty(part.element.as_deref()),
        id: non_empty(part.id.as_deref()),
        classes: sorted_names(&part.classes),
        qualifiers: sorted_names(&part.qualifiers),
        suffix: non_empty(part.suffix.as_deref()),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|text| !text.is_empty()).map(ToOwned::to_owned)
}

fn sorted_names(names: &NameList) -> NameList {
    let mut sorted: Vec<String> = names.iter().filter(|name| !name.is_empty()).cloned().collect();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.into_iter().collect()
}
