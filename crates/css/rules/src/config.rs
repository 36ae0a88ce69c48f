//! Tree configuration.

/// Key raw text specifications are stored under unless configured otherwise.
pub const DEFAULT_RAW_TEXT_KEY: &str = "$raw";

/// Settings shared by every rule of a [`RuleTree`](crate::RuleTree).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeConfig {
    /// Reserved property name carrying raw text.
    raw_text_key: String,
    /// Name used to tell trees apart in log lines.
    label: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            raw_text_key: DEFAULT_RAW_TEXT_KEY.to_owned(),
            label: "rules".to_owned(),
        }
    }
}

impl TreeConfig {
    /// The default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_raw_text_key(mut self, key: impl Into<String>) -> Self {
        self.raw_text_key = key.into();
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Reserved property name carrying raw text.
    pub fn raw_text_key(&self) -> &str {
        &self.raw_text_key
    }

    /// Name used to tell trees apart in log lines.
    pub fn label(&self) -> &str {
        &self.label
    }
}
