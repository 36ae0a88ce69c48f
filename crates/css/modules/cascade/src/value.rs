//! Property values and their priority.

use core::fmt;
use std::rc::Rc;

/// Suffix that elevates a textual value.
pub const IMPORTANT_SUFFIX: &str = "!important";

/// Rank used to resolve merge conflicts. Higher wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Priority(pub i32);

impl Priority {
    /// Ordinary declarations.
    pub const DEFAULT: Self = Self(0);
    /// Declarations marked `!important`.
    pub const IMPORTANT: Self = Self(1);

    /// An explicit numeric rank.
    #[inline]
    pub const fn rank(rank: i32) -> Self {
        Self(rank)
    }

    /// Whether this priority is above the default.
    #[inline]
    pub const fn is_elevated(self) -> bool {
        self.0 > Self::DEFAULT.0
    }
}

/// Contract for structured values (lengths, colors, `calc()` …) that live
/// outside this crate.
pub trait CssValue: fmt::Debug {
    /// Priority this value carries.
    fn priority(&self) -> Priority {
        Priority::DEFAULT
    }

    /// Equality against any other value, of the same kind or not.
    fn equals(&self, other: &PropertyValue) -> bool;

    /// CSS text of the value.
    fn to_css(&self) -> String;
}

/// A single property value.
#[derive(Clone, Debug)]
pub enum PropertyValue {
    /// Textual value, possibly ending in [`IMPORTANT_SUFFIX`].
    Text(Rc<str>),
    /// Bare number.
    Number(f64),
    /// Value implemented by an external value algebra.
    Structured(Rc<dyn CssValue>),
}

impl PropertyValue {
    /// Build a textual value.
    pub fn text(text: impl Into<Rc<str>>) -> Self {
        Self::Text(text.into())
    }

    /// Build a structured value.
    pub fn structured(value: impl CssValue + 'static) -> Self {
        Self::Structured(Rc::new(value))
    }

    /// Priority of this value.
    ///
    /// Text ending in `!important` is elevated, structured values report their
    /// own, everything else is default.
    pub fn priority(&self) -> Priority {
        match self {
            Self::Text(text) => text_priority(text),
            Self::Number(_) => Priority::DEFAULT,
            Self::Structured(value) => value.priority(),
        }
    }

    /// Priority-aware equality: same priority and same value.
    pub fn same_as(&self, other: &Self) -> bool {
        if self.priority() != other.priority() {
            return false;
        }
        match (self, other) {
            (Self::Text(left), Self::Text(right)) => left == right,
            (Self::Number(left), Self::Number(right)) => {
                left == right || (left.is_nan() && right.is_nan())
            }
            (Self::Structured(left), Self::Structured(right)) => {
                Rc::ptr_eq(left, right) || left.equals(other)
            }
            (Self::Structured(left), _) => left.equals(other),
            (_, Self::Structured(right)) => right.equals(self),
            _ => false,
        }
    }

    /// The text, for textual values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(&**text),
            Self::Number(_) | Self::Structured(_) => None,
        }
    }
}

/// Priority of a textual value: elevated when it ends in `!important`.
///
/// Matching is ASCII case-insensitive and tolerates whitespace after `!`.
pub fn text_priority(text: &str) -> Priority {
    const KEYWORD: &str = "important";
    let trimmed = text.trim_end();
    let Some(split) = trimmed.len().checked_sub(KEYWORD.len()) else {
        return Priority::DEFAULT;
    };
    let (head, tail) = (trimmed.get(..split), trimmed.get(split..));
    match (head, tail) {
        (Some(head), Some(tail)) if tail.eq_ignore_ascii_case(KEYWORD) => {
            if head.trim_end().ends_with('!') {
                Priority::IMPORTANT
            } else {
                Priority::DEFAULT
            }
        }
        _ => Priority::DEFAULT,
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl From<&str> for PropertyValue {
    fn from(text: &str) -> Self {
        Self::Text(text.into())
    }
}

impl From<String> for PropertyValue {
    fn from(text: String) -> Self {
        Self::Text(text.into())
    }
}

impl From<f64> for PropertyValue {
    fn from(number: f64) -> Self {
        Self::Number(number)
    }
}

impl From<i32> for PropertyValue {
    fn from(number: i32) -> Self {
        Self::Number(f64::from(number))
    }
}

impl From<Rc<dyn CssValue>> for PropertyValue {
    fn from(value: Rc<dyn CssValue>) -> Self {
        Self::Structured(value)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => formatter.write_str(text),
            Self::Number(number) => write!(formatter, "{number}"),
            Self::Structured(value) => formatter.write_str(&value.to_css()),
        }
    }
}
