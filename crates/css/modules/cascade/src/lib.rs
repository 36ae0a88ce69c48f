//! Priority-aware property values and map merging.
//!
//! Resolving a rule's properties combines two property maps at a time: the
//! rule's earlier declarations (the *base*) and a later addition (the
//! *addendum*). For every property the later declaration wins, unless the
//! earlier one carries a strictly higher [`Priority`]:
//!
//! ```text
//! base       { color: red !important, margin: 0 }
//! addendum   { color: blue,           padding: 1px }
//! merged     { color: red !important, margin: 0, padding: 1px }
//! ```
//!
//! Cascade ordering by importance: <https://www.w3.org/TR/css-cascade-4/#importance>

#![forbid(unsafe_code)]
#![allow(
    clippy::module_name_repetitions,
    reason = "PropertyMap and PropertyValue are clearer than Map and Value"
)]
#![allow(clippy::redundant_pub_crate, reason = "Crate-internal helpers are marked explicitly")]

mod map;
mod value;

use core::cmp::Ordering;
use log::trace;

// Re-export public API
pub use map::PropertyMap;
pub use value::{CssValue, IMPORTANT_SUFFIX, Priority, PropertyValue, text_priority};

/// Compare the priorities of two values.
/// Returns `Ordering::Greater` if `left` ranks above `right`.
#[inline]
pub fn compare_priority(left: &PropertyValue, right: &PropertyValue) -> Ordering {
    left.priority().cmp(&right.priority())
}

/// Resolve one property declared twice.
///
/// `incoming` wins unless `existing` ranks strictly higher; on a tie the
/// later declaration wins.
pub fn combine_one<'value>(
    existing: &'value PropertyValue,
    incoming: &'value PropertyValue,
) -> &'value PropertyValue {
    if compare_priority(existing, incoming) == Ordering::Greater {
        existing
    } else {
        incoming
    }
}

/// Merge `addendum` over `base`.
///
/// Keys keep the base order, followed by keys only the addendum has. Neither
/// input is modified.
pub fn merge_maps(base: &PropertyMap, addendum: &PropertyMap) -> PropertyMap {
    if addendum.is_empty() {
        return base.clone();
    }
    if base.is_empty() {
        return addendum.clone();
    }
    let mut entries = base.entries().clone();
    for (name, incoming) in addendum.entries() {
        entries
            .entry(name.clone())
            .and_modify(|existing| *existing = combine_one(existing, incoming).clone())
            .or_insert_with(|| incoming.clone());
    }
    trace!(
        "Merged {} base and {} addendum properties into {}",
        base.len(),
        addendum.len(),
        entries.len()
    );
    PropertyMap::from_entries(entries)
}
