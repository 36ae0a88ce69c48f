//! Immutable property snapshots.

use crate::value::PropertyValue;
use core::fmt;
use indexmap::IndexMap;
use std::rc::Rc;

/// Insertion-ordered `name → value` snapshot.
///
/// Cloning is cheap and shares storage; [`PropertyMap::with`] and
/// [`PropertyMap::without`] return new maps and never touch `self`.
#[derive(Clone, Default)]
pub struct PropertyMap {
    entries: Rc<IndexMap<String, PropertyValue>>,
}

impl PropertyMap {
    /// The empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// A map holding only `text` under `key`.
    pub fn raw(key: &str, text: impl Into<PropertyValue>) -> Self {
        Self::new().with(key, text)
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Property names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// A copy with `name` set to `value`. An existing name keeps its position.
    #[must_use]
    pub fn with(&self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        let mut entries = (*self.entries).clone();
        entries.insert(name.into(), value.into());
        Self {
            entries: Rc::new(entries),
        }
    }

    /// A copy without `name`.
    #[must_use]
    pub fn without(&self, name: &str) -> Self {
        if !self.contains(name) {
            return self.clone();
        }
        let mut entries = (*self.entries).clone();
        entries.shift_remove(name);
        Self {
            entries: Rc::new(entries),
        }
    }

    /// Same key set and priority-aware equal values. Order is ignored.
    pub fn same_as(&self, other: &Self) -> bool {
        if Rc::ptr_eq(&self.entries, &other.entries) {
            return true;
        }
        self.len() == other.len()
            && self.entries.iter().all(|(name, value)| {
                other
                    .entries
                    .get(name)
                    .is_some_and(|theirs| value.same_as(theirs))
            })
    }

    pub(crate) fn from_entries(entries: IndexMap<String, PropertyValue>) -> Self {
        Self {
            entries: Rc::new(entries),
        }
    }

    pub(crate) fn entries(&self) -> &IndexMap<String, PropertyValue> {
        &self.entries
    }
}

impl PartialEq for PropertyMap {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl fmt::Debug for PropertyMap {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_map()
            .entries(self.entries.iter().map(|(name, value)| (name, value.to_string())))
            .finish()
    }
}

impl<K: Into<String>, V: Into<PropertyValue>> FromIterator<(K, V)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_entries(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

impl<const N: usize> From<[(&str, &str); N]> for PropertyMap {
    fn from(pairs: [(&str, &str); N]) -> Self {
        pairs.into_iter().collect()
    }
}
