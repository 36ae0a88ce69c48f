//! Terminal stream failures.

use std::rc::Rc;
use thiserror::Error;

/// Error delivered through [`Event::Failed`](crate::Event::Failed).
///
/// Failures fan out to every observer of a stream, so the payload is shared.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// A user-supplied specification function returned an error.
    #[error("specification failed: {0:#}")]
    Specification(Rc<anyhow::Error>),
    /// An upstream producer reported a failure.
    #[error("upstream failed: {0}")]
    Upstream(Rc<str>),
}

impl StreamError {
    /// Wrap an error returned by a specification function.
    pub fn specification(error: anyhow::Error) -> Self {
        Self::Specification(Rc::new(error))
    }

    /// Build an upstream failure from a message.
    pub fn upstream(message: impl Into<Rc<str>>) -> Self {
        Self::Upstream(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn display_includes_cause_chain() {
        let error = StreamError::specification(anyhow!("inner").context("outer"));
        assert_eq!(error.to_string(), "specification failed: outer: inner");
        assert_eq!(
            StreamError::upstream("socket closed").to_string(),
            "upstream failed: socket closed"
        );
    }
}
