//! Error classification: deciding whether a failure is worth retrying.
//!
//! Errors are matched by [`ErrorCategory`], which every error type reports
//! through the [`Classify`] trait. Two classifiers decide from a set of
//! categories:
//!
//! - [`ErrorWhitelist`] retries everything except the listed categories. It
//!   is the default, seeded with the process-wide set of terminal categories.
//! - [`ErrorBlacklist`] retries only the listed categories.
//!
//! A retrier holds exactly one of them as an [`ErrorPolicy`].
//!
//! # Implementing `Classify`
//!
//! ```rust
//! use persevere::classify::{Classify, ErrorCategory, ErrorWhitelist};
//!
//! #[derive(Debug)]
//! enum DbError {
//!     Deadlock,
//!     SchemaMismatch,
//! }
//!
//! impl Classify for DbError {
//!     fn category(&self) -> ErrorCategory {
//!         match self {
//!             DbError::Deadlock => ErrorCategory::new("db.deadlock").unwrap(),
//!             DbError::SchemaMismatch => ErrorCategory::SYNTAX,
//!         }
//!     }
//! }
//!
//! let whitelist = ErrorWhitelist::new();
//! assert!(whitelist.is_retryable(&DbError::Deadlock));
//! assert!(!whitelist.is_retryable(&DbError::SchemaMismatch));
//! ```

mod category;
mod lists;
mod marker;
mod registry;

use std::error::Error as StdError;
use std::io;

pub use category::{ErrorCategory, IntoCategory};
pub use lists::{ErrorBlacklist, ErrorPolicy, ErrorWhitelist};
pub use marker::{Categorized, NotRetriable};
pub use registry::{add_whitelist_error, default_whitelist};

/// Errors that can be sorted into an [`ErrorCategory`].
pub trait Classify {
    /// The category this error belongs to.
    fn category(&self) -> ErrorCategory;

    /// Whether this particular error should be retried even though its
    /// category is whitelisted. Defaults to `false`.
    fn force_retry(&self) -> bool {
        false
    }
}

impl<T: Classify + ?Sized> Classify for &T {
    fn category(&self) -> ErrorCategory {
        (**self).category()
    }

    fn force_retry(&self) -> bool {
        (**self).force_retry()
    }
}

impl<T: Classify + ?Sized> Classify for Box<T> {
    fn category(&self) -> ErrorCategory {
        (**self).category()
    }

    fn force_retry(&self) -> bool {
        (**self).force_retry()
    }
}

impl Classify for str {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::OTHER
    }
}

impl Classify for String {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::OTHER
    }
}

/// Every I/O error kind, `Interrupted` included, is [`ErrorCategory::IO`].
/// [`ErrorCategory::INTERRUPTED`] names interruption of the process, not of
/// a single system call.
impl Classify for io::Error {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::IO
    }
}

impl Classify for dyn StdError + Send + Sync {
    fn category(&self) -> ErrorCategory {
        if let Some(err) = self.downcast_ref::<NotRetriable>() {
            return err.category();
        }
        if let Some(err) = self.downcast_ref::<io::Error>() {
            return err.category();
        }
        ErrorCategory::OTHER
    }

    fn force_retry(&self) -> bool {
        self.downcast_ref::<NotRetriable>()
            .is_some_and(NotRetriable::force_retry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_categories() {
        assert_eq!(
            io::Error::from(io::ErrorKind::Interrupted).category(),
            ErrorCategory::IO
        );
        assert_eq!(io::Error::other("x").category(), ErrorCategory::IO);
    }

    #[test]
    fn test_boxed_dyn_error_downcasts() {
        let boxed: Box<dyn StdError + Send + Sync> = Box::new(NotRetriable::new("no"));
        assert_eq!(boxed.category(), ErrorCategory::NOT_RETRIABLE);
        assert!(!boxed.force_retry());

        let boxed: Box<dyn StdError + Send + Sync> = Box::new(NotRetriable::new("yes").retrying());
        assert!(boxed.force_retry());

        let boxed: Box<dyn StdError + Send + Sync> = "plain".into();
        assert_eq!(boxed.category(), ErrorCategory::OTHER);
    }

    #[test]
    fn test_references_delegate() {
        let err = NotRetriable::new("x").retrying();
        let by_ref = &err;
        assert_eq!(by_ref.category(), ErrorCategory::NOT_RETRIABLE);
        assert!(by_ref.force_retry());
    }
}
