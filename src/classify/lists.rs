//! Whitelist and blacklist classifiers.

use std::collections::HashSet;

use super::category::{collect_categories, ErrorCategory, IntoCategory};
use super::registry::default_whitelist;
use super::Classify;
use crate::error::ConfigError;

/// Set-management methods shared by both list types.
macro_rules! category_list {
    ($list:ident) => {
        impl $list {
            /// A list seeded with a copy of the process-wide default whitelist.
            pub fn new() -> Self {
                Self {
                    errors: default_whitelist(),
                }
            }

            /// A list with no categories.
            pub fn empty() -> Self {
                Self {
                    errors: HashSet::new(),
                }
            }

            /// A list holding exactly `errors`.
            pub fn with_errors<I>(errors: I) -> Result<Self, ConfigError>
            where
                I: IntoIterator,
                I::Item: IntoCategory,
            {
                let mut list = Self::empty();
                list.set_errors(errors)?;
                Ok(list)
            }

            /// The categories in this list.
            pub fn errors(&self) -> &HashSet<ErrorCategory> {
                &self.errors
            }

            /// Replace the whole set.
            ///
            /// Every entry is validated first; on error the list is unchanged.
            pub fn set_errors<I>(&mut self, errors: I) -> Result<(), ConfigError>
            where
                I: IntoIterator,
                I::Item: IntoCategory,
            {
                self.errors = collect_categories(errors)?.into_iter().collect();
                Ok(())
            }

            /// Add categories, keeping the existing ones.
            ///
            /// Every entry is validated first; on error the list is unchanged.
            pub fn add<I>(&mut self, errors: I) -> Result<(), ConfigError>
            where
                I: IntoIterator,
                I::Item: IntoCategory,
            {
                self.errors.extend(collect_categories(errors)?);
                Ok(())
            }

            /// Whether `category` is in the list.
            pub fn contains(&self, category: &ErrorCategory) -> bool {
                self.errors.contains(category)
            }

            /// Number of categories.
            pub fn len(&self) -> usize {
                self.errors.len()
            }

            /// Whether the list has no categories.
            pub fn is_empty(&self) -> bool {
                self.errors.is_empty()
            }
        }

        impl Default for $list {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

/// Classifier retrying every error except those in its list.
///
/// An error whose category is listed is terminal, unless the error itself
/// asks to be retried through [`Classify::force_retry`].
///
/// # Examples
///
/// ```rust
/// use persevere::classify::{ErrorWhitelist, NotRetriable};
///
/// let whitelist = ErrorWhitelist::new();
///
/// assert!(!whitelist.is_retryable(&NotRetriable::new("bad credentials")));
/// assert!(whitelist.is_retryable(&NotRetriable::new("flaky").retrying()));
/// assert!(whitelist.is_retryable(&std::io::Error::other("reset")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorWhitelist {
    errors: HashSet<ErrorCategory>,
}

category_list!(ErrorWhitelist);

impl ErrorWhitelist {
    /// Whether `error` should be retried.
    pub fn is_retryable<E: Classify + ?Sized>(&self, error: &E) -> bool {
        !self.contains(&error.category()) || error.force_retry()
    }
}

/// Classifier retrying only the errors in its list.
///
/// The inverse of [`ErrorWhitelist`]: for the same set of categories it
/// answers the opposite way. The per-error [`Classify::force_retry`] flag is
/// not consulted.
///
/// # Examples
///
/// ```rust
/// use persevere::classify::ErrorBlacklist;
///
/// let blacklist = ErrorBlacklist::with_errors(["io"]).unwrap();
///
/// assert!(blacklist.is_retryable(&std::io::Error::other("reset")));
/// assert!(!blacklist.is_retryable("parse failure"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBlacklist {
    errors: HashSet<ErrorCategory>,
}

category_list!(ErrorBlacklist);

impl ErrorBlacklist {
    /// Whether `error` should be retried.
    pub fn is_retryable<E: Classify + ?Sized>(&self, error: &E) -> bool {
        self.contains(&error.category())
    }
}

/// The classifier a retrier consults: exactly one of a whitelist or a
/// blacklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Retry unless listed.
    Whitelist(ErrorWhitelist),
    /// Retry only if listed.
    Blacklist(ErrorBlacklist),
}

impl ErrorPolicy {
    /// Whether `error` should be retried.
    pub fn is_retryable<E: Classify + ?Sized>(&self, error: &E) -> bool {
        match self {
            Self::Whitelist(list) => list.is_retryable(error),
            Self::Blacklist(list) => list.is_retryable(error),
        }
    }

    /// The categories of the active list.
    pub fn errors(&self) -> &HashSet<ErrorCategory> {
        match self {
            Self::Whitelist(list) => list.errors(),
            Self::Blacklist(list) => list.errors(),
        }
    }
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self::Whitelist(ErrorWhitelist::new())
    }
}

impl From<ErrorWhitelist> for ErrorPolicy {
    fn from(list: ErrorWhitelist) -> Self {
        Self::Whitelist(list)
    }
}

impl From<ErrorBlacklist> for ErrorPolicy {
    fn from(list: ErrorBlacklist) -> Self {
        Self::Blacklist(list)
    }
}
