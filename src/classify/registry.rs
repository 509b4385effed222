//! The process-wide default whitelist.
//!
//! Every [`ErrorWhitelist::new`](super::ErrorWhitelist::new) and
//! [`ErrorBlacklist::new`](super::ErrorBlacklist::new) starts from a private
//! copy of this set. It begins with [`ErrorCategory::builtins`] and can only
//! grow, through [`add_whitelist_error`]. Register application categories
//! once at startup; classifiers built before a registration keep the set
//! they were created with.

use std::collections::HashSet;
use std::sync::{LazyLock, PoisonError, RwLock};

use super::category::{collect_categories, ErrorCategory, IntoCategory};
use crate::error::ConfigError;

static DEFAULT_WHITELIST: LazyLock<RwLock<HashSet<ErrorCategory>>> =
    LazyLock::new(|| RwLock::new(ErrorCategory::builtins().into_iter().collect()));

/// Add categories to the process-wide default whitelist.
///
/// Errors in these categories will not be retried by any default whitelist
/// created afterwards. Every entry is validated before any is added; on
/// error the registry is left untouched.
///
/// # Examples
///
/// ```rust
/// use persevere::classify::{add_whitelist_error, default_whitelist, ErrorCategory};
///
/// add_whitelist_error(["auth.denied"]).unwrap();
///
/// let denied = ErrorCategory::new("auth.denied").unwrap();
/// assert!(default_whitelist().contains(&denied));
/// ```
pub fn add_whitelist_error<I>(categories: I) -> Result<(), ConfigError>
where
    I: IntoIterator,
    I::Item: IntoCategory,
{
    let categories = collect_categories(categories)?;

    #[cfg(feature = "tracing")]
    tracing::debug!(
        categories = ?categories,
        "extending default error whitelist"
    );

    DEFAULT_WHITELIST
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .extend(categories);
    Ok(())
}

/// Snapshot of the process-wide default whitelist.
pub fn default_whitelist() -> HashSet<ErrorCategory> {
    DEFAULT_WHITELIST
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}
