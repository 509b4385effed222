//! Ready-made classified error types.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use super::{Classify, ErrorCategory};

/// An error that the default whitelist will not retry.
///
/// Return it (or wrap your own error in it) to stop a retry loop. Call
/// [`retrying`](Self::retrying) on an individual instance to flag it as
/// retryable after all.
///
/// # Examples
///
/// ```rust
/// use persevere::classify::{Classify, ErrorCategory, NotRetriable};
///
/// let err = NotRetriable::new("account locked");
/// assert_eq!(err.category(), ErrorCategory::NOT_RETRIABLE);
/// assert!(!err.force_retry());
///
/// let err = err.retrying();
/// assert!(err.force_retry());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotRetriable {
    message: Cow<'static, str>,
    retry: bool,
}

impl NotRetriable {
    /// Create a non-retriable error.
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
            retry: false,
        }
    }

    /// Flag this instance as retryable despite its category.
    pub fn retrying(mut self) -> Self {
        self.retry = true;
        self
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for NotRetriable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for NotRetriable {}

impl Classify for NotRetriable {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::NOT_RETRIABLE
    }

    fn force_retry(&self) -> bool {
        self.retry
    }
}

/// Attaches a category and force-retry flag to any error.
///
/// Useful for error types you don't own, or for classifying one occurrence
/// differently from the type's default.
///
/// # Examples
///
/// ```rust
/// use persevere::classify::{Categorized, Classify, ErrorCategory};
///
/// let err = Categorized::new(
///     std::io::Error::other("quota exceeded"),
///     ErrorCategory::new("quota").unwrap(),
/// );
///
/// assert_eq!(err.category().as_str(), "quota");
/// assert_eq!(err.to_string(), "quota exceeded");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categorized<E> {
    error: E,
    category: ErrorCategory,
    retry: bool,
}

impl<E> Categorized<E> {
    /// Wrap `error` under `category`.
    pub fn new(error: E, category: ErrorCategory) -> Self {
        Self {
            error,
            category,
            retry: false,
        }
    }

    /// Flag this instance as retryable despite its category.
    pub fn retrying(mut self) -> Self {
        self.retry = true;
        self
    }

    /// The wrapped error.
    pub fn inner(&self) -> &E {
        &self.error
    }

    /// Unwrap the error.
    pub fn into_inner(self) -> E {
        self.error
    }
}

/// Transparent: displays as the wrapped error and shares its source.
impl<E: fmt::Display> fmt::Display for Categorized<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl<E: StdError + 'static> StdError for Categorized<E> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.error.source()
    }
}

impl<E> Classify for Categorized<E> {
    fn category(&self) -> ErrorCategory {
        self.category.clone()
    }

    fn force_retry(&self) -> bool {
        self.retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_retriable_display() {
        let err = NotRetriable::new(format!("code {}", 7));
        assert_eq!(err.to_string(), "code 7");
        assert_eq!(err.message(), "code 7");
    }

    #[derive(Debug)]
    struct Wrapped(std::io::Error);

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "request failed")
        }
    }

    impl StdError for Wrapped {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    fn chain(err: &dyn StdError) -> Vec<String> {
        let mut messages = vec![err.to_string()];
        let mut current = err.source();
        while let Some(source) = current {
            messages.push(source.to_string());
            current = source.source();
        }
        messages
    }

    #[test]
    fn test_categorized_is_transparent() {
        let err = Categorized::new(std::io::Error::other("inner"), ErrorCategory::IO).retrying();
        assert!(err.force_retry());
        assert_eq!(err.to_string(), "inner");
        assert!(err.source().is_none());
        assert_eq!(err.into_inner().to_string(), "inner");
    }

    #[test]
    fn test_categorized_chain_has_no_duplicates() {
        let err = Categorized::new(
            Wrapped(std::io::Error::other("connection reset")),
            ErrorCategory::IO,
        );
        assert_eq!(chain(&err), vec!["request failed", "connection reset"]);
    }
}
