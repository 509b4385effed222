//! Error categories.

use std::borrow::Cow;
use std::fmt;

use crate::error::ConfigError;

/// Identifier naming a class of failure.
///
/// Classifiers match errors by category rather than by concrete type, so one
/// whitelist can cover many error types. Names must be non-empty, carry no
/// surrounding whitespace and contain no control characters.
///
/// # Examples
///
/// ```rust
/// use persevere::classify::ErrorCategory;
///
/// let throttled = ErrorCategory::new("http.throttled").unwrap();
/// assert_eq!(throttled.as_str(), "http.throttled");
///
/// assert!(ErrorCategory::new("").is_err());
/// assert!(ErrorCategory::new(" padded ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorCategory(Cow<'static, str>);

impl ErrorCategory {
    /// The operation was interrupted by the user or the process.
    pub const INTERRUPTED: Self = Self::from_static("interrupted");
    /// The process was asked to exit.
    pub const EXIT: Self = Self::from_static("exit");
    /// A module, plugin or dynamic dependency failed to load.
    pub const IMPORT: Self = Self::from_static("import");
    /// Malformed input that will never parse.
    pub const SYNTAX: Self = Self::from_static("syntax");
    /// A reference to something that no longer exists.
    pub const REFERENCE: Self = Self::from_static("reference");
    /// Explicitly marked as not worth retrying.
    pub const NOT_RETRIABLE: Self = Self::from_static("not_retriable");
    /// I/O failures.
    pub const IO: Self = Self::from_static("io");
    /// Errors that carry no classification of their own.
    pub const OTHER: Self = Self::from_static("other");

    const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create a category, validating its name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Result<Self, ConfigError> {
        let name = name.into();
        if is_valid_name(&name) {
            Ok(Self(name))
        } else {
            Err(ConfigError::InvalidCategory {
                name: name.into_owned(),
            })
        }
    }

    /// Category named after a Rust type.
    ///
    /// ```rust
    /// use persevere::classify::ErrorCategory;
    ///
    /// let category = ErrorCategory::of::<std::num::ParseIntError>();
    /// assert!(category.as_str().ends_with("ParseIntError"));
    /// ```
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::from_static(std::any::type_name::<T>())
    }

    /// The categories every default whitelist starts with.
    pub fn builtins() -> [Self; 6] {
        [
            Self::INTERRUPTED,
            Self::EXIT,
            Self::IMPORT,
            Self::SYNTAX,
            Self::REFERENCE,
            Self::NOT_RETRIABLE,
        ]
    }

    /// The category name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.trim() == name && !name.chars().any(char::is_control)
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ErrorCategory {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Conversion into a validated [`ErrorCategory`].
///
/// Implemented for categories themselves (always valid) and for strings
/// (validated). Classifier mutators accept any iterator of these.
pub trait IntoCategory {
    /// Convert, validating the name if needed.
    fn into_category(self) -> Result<ErrorCategory, ConfigError>;
}

impl IntoCategory for ErrorCategory {
    fn into_category(self) -> Result<ErrorCategory, ConfigError> {
        Ok(self)
    }
}

impl IntoCategory for &ErrorCategory {
    fn into_category(self) -> Result<ErrorCategory, ConfigError> {
        Ok(self.clone())
    }
}

impl IntoCategory for &str {
    fn into_category(self) -> Result<ErrorCategory, ConfigError> {
        ErrorCategory::new(self.to_owned())
    }
}

impl IntoCategory for String {
    fn into_category(self) -> Result<ErrorCategory, ConfigError> {
        ErrorCategory::new(self)
    }
}

/// Validate a whole batch, failing on the first invalid entry.
pub(crate) fn collect_categories<I>(categories: I) -> Result<Vec<ErrorCategory>, ConfigError>
where
    I: IntoIterator,
    I::Item: IntoCategory,
{
    categories
        .into_iter()
        .map(IntoCategory::into_category)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["io", "http.503", "db::deadlock", "Timeout"] {
            assert_eq!(ErrorCategory::new(name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", " ", "\tleading", "trailing\n", "bell\u{7}"] {
            assert_eq!(
                ErrorCategory::new(name),
                Err(ConfigError::InvalidCategory {
                    name: name.to_string()
                })
            );
        }
    }

    #[test]
    fn test_builtins_are_distinct() {
        let builtins = ErrorCategory::builtins();
        let unique: std::collections::HashSet<_> = builtins.iter().collect();
        assert_eq!(unique.len(), builtins.len());
        assert!(builtins.contains(&ErrorCategory::NOT_RETRIABLE));
        assert!(!builtins.contains(&ErrorCategory::OTHER));
        assert!(!builtins.iter().any(|c| c.as_str() == "index"));
    }

    #[test]
    fn test_of_uses_type_name() {
        assert!(ErrorCategory::of::<String>().as_str().ends_with("String"));
    }

    #[test]
    fn test_collect_categories_fails_on_any_invalid() {
        assert!(collect_categories(["ok", ""]).is_err());
        assert_eq!(collect_categories(["a", "b"]).unwrap().len(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorCategory::SYNTAX.to_string(), "syntax");
    }
}
