//! Configuration errors.
//!
//! Raised when a backoff, classifier or retrier is built from invalid
//! parameters. They indicate misuse and are never retried.

use std::fmt;

/// Error returned when a component is constructed from invalid parameters.
///
/// # Examples
///
/// ```rust
/// use persevere::backoff::ExponentialBackoff;
/// use persevere::ConfigError;
///
/// let err = ExponentialBackoff::builder()
///     .multiplier(-2.0)
///     .build()
///     .unwrap_err();
///
/// assert!(matches!(err, ConfigError::InvalidParameter { name: "multiplier", .. }));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A numeric parameter was negative, NaN or infinite.
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// The rejected value.
        value: f64,
        /// Why the value was rejected.
        reason: &'static str,
    },
    /// A string could not be used as an error category.
    InvalidCategory {
        /// The rejected category name.
        name: String,
    },
}

impl ConfigError {
    pub(crate) fn negative(name: &'static str, value: f64) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason: "must be a non-negative number",
        }
    }

    pub(crate) fn not_finite(name: &'static str, value: f64) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason: "must be a finite number",
        }
    }

    /// Check that a float parameter is finite and non-negative.
    pub(crate) fn check_non_negative(name: &'static str, value: f64) -> Result<f64, Self> {
        if !value.is_finite() {
            Err(Self::not_finite(name, value))
        } else if value < 0.0 {
            Err(Self::negative(name, value))
        } else {
            Ok(value)
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter {
                name,
                value,
                reason,
            } => write!(f, "invalid `{}` parameter {}: {}", name, value, reason),
            Self::InvalidCategory { name } => {
                write!(f, "invalid error category {:?}: expected a non-empty identifier", name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_non_negative() {
        assert_eq!(ConfigError::check_non_negative("factor", 0.5), Ok(0.5));
        assert_eq!(ConfigError::check_non_negative("factor", 0.0), Ok(0.0));
        assert_eq!(
            ConfigError::check_non_negative("factor", -1.0),
            Err(ConfigError::negative("factor", -1.0))
        );
        assert!(matches!(
            ConfigError::check_non_negative("factor", f64::INFINITY),
            Err(ConfigError::InvalidParameter {
                reason: "must be a finite number",
                ..
            })
        ));
        assert!(ConfigError::check_non_negative("factor", f64::NAN).is_err());
    }

    #[test]
    fn test_display() {
        let err = ConfigError::negative("timeout", -1.0);
        assert_eq!(
            err.to_string(),
            "invalid `timeout` parameter -1: must be a non-negative number"
        );

        let err = ConfigError::InvalidCategory {
            name: "not valid".to_string(),
        };
        assert!(err.to_string().contains("\"not valid\""));
    }
}
