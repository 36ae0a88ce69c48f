//! Property specifications.

use core::fmt;
use crate::rule::Rule;
use css_cascade::{PropertyMap, PropertyValue};
use std::rc::Rc;
use style_stream::Stream;

/// Specification computed from the rule it is installed on.
pub type DeriveFn = dyn Fn(&Rule) -> anyhow::Result<Spec>;

/// What a rule declares. Resolved per subscription by
/// [`normalize_spec`](crate::normalize_spec).
#[derive(Clone, Default)]
pub enum Spec {
    /// No properties.
    #[default]
    Empty,
    /// A literal map.
    Properties(PropertyMap),
    /// Raw text, carried under the tree's raw text key.
    Text(Rc<str>),
    /// A live stream of maps.
    Stream(Stream<PropertyMap>),
    /// Evaluated with the owning rule each time the rule is read.
    Derive(Rc<DeriveFn>),
    /// A base specification with an addendum merged over it.
    Merge(Rc<Spec>, Rc<Spec>),
}

impl Spec {
    /// Build a [`Spec::Derive`].
    pub fn derive(derive: impl Fn(&Rule) -> anyhow::Result<Self> + 'static) -> Self {
        Self::Derive(Rc::new(derive))
    }

    /// A live stream of raw text.
    pub fn text_stream(stream: Stream<Rc<str>>) -> Self {
        Self::derive(move |rule| {
            let key = rule.tree_config().raw_text_key().to_owned();
            Ok(Self::Stream(stream.map(move |text| {
                PropertyMap::raw(&key, PropertyValue::Text(text))
            })))
        })
    }

    /// `addendum` merged over `self`. Merging into [`Spec::Empty`], or merging
    /// an empty addendum, keeps the other side as is.
    #[must_use]
    pub fn merged_with(self, addendum: Self) -> Self {
        match (self, addendum) {
            (Self::Empty, addendum) => addendum,
            (base, Self::Empty) => base,
            (base, addendum) => Self::Merge(Rc::new(base), Rc::new(addendum)),
        }
    }

    /// Whether this is [`Spec::Empty`].
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Properties(_) => "properties",
            Self::Text(_) => "text",
            Self::Stream(_) => "stream",
            Self::Derive(_) => "derive",
            Self::Merge(..) => "merge",
        }
    }
}

impl fmt::Debug for Spec {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Properties(map) => formatter.debug_tuple("Properties").field(map).finish(),
            Self::Text(text) => formatter.debug_tuple("Text").field(text).finish(),
            Self::Merge(base, addendum) => formatter
                .debug_tuple("Merge")
                .field(base)
                .field(addendum)
                .finish(),
            Self::Empty | Self::Stream(_) | Self::Derive(_) => formatter.write_str(self.kind()),
        }
    }
}

impl From<PropertyMap> for Spec {
    fn from(map: PropertyMap) -> Self {
        Self::Properties(map)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Spec {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self::Properties(PropertyMap::from(pairs))
    }
}

impl From<&str> for Spec {
    fn from(text: &str) -> Self {
        Self::Text(text.into())
    }
}

impl From<String> for Spec {
    fn from(text: String) -> Self {
        Self::Text(text.into())
    }
}

impl From<Stream<PropertyMap>> for Spec {
    fn from(stream: Stream<PropertyMap>) -> Self {
        Self::Stream(stream)
    }
}

impl From<Option<Self>> for Spec {
    fn from(spec: Option<Self>) -> Self {
        spec.unwrap_or_default()
    }
}
