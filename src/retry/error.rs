//! Error types for retry operations.

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

/// Error returned when a retry run ends without a value.
///
/// Either the operation's own error, passed through unchanged because it was
/// classified as terminal, or one of the failures raised by the engine
/// itself. Engine failures keep the last operation error as their `cause`,
/// which is also exposed through [`std::error::Error::source`].
///
/// # Examples
///
/// ```rust
/// use persevere::backoff::ConstantBackoff;
/// use persevere::{Retrier, RetryError};
/// use std::time::Duration;
///
/// let mut retrier = Retrier::<(), &str>::builder()
///     .backoff(ConstantBackoff::new(Duration::ZERO, 2))
///     .build();
///
/// match retrier.run(|| Err("always fails")) {
///     Err(RetryError::MaxRetriesExceeded { attempts, cause }) => {
///         assert_eq!(attempts, 2);
///         assert_eq!(cause, Some("always fails"));
///     }
///     other => panic!("unexpected outcome: {:?}", other),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The operation failed with an error classified as not retryable.
    Operation(E),
    /// The backoff strategy ran out of retries.
    MaxRetriesExceeded {
        /// Retries performed before giving up.
        attempts: u32,
        /// The last operation error.
        cause: Option<E>,
    },
    /// The run took longer than the configured timeout.
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
        /// Retries performed before the deadline.
        attempts: u32,
        /// The last operation error, if any attempt had failed yet.
        cause: Option<E>,
    },
    /// The result evaluator asked for a retry without supplying an error.
    EvaluatorMisuse {
        /// The last operation error, if any attempt had failed yet.
        cause: Option<E>,
    },
}

impl<E> RetryError<E> {
    /// The operation error carried by this failure, if any.
    pub fn cause(&self) -> Option<&E> {
        match self {
            Self::Operation(error) => Some(error),
            Self::MaxRetriesExceeded { cause, .. }
            | Self::Timeout { cause, .. }
            | Self::EvaluatorMisuse { cause } => cause.as_ref(),
        }
    }

    /// Extract the operation error carried by this failure, if any.
    pub fn into_cause(self) -> Option<E> {
        match self {
            Self::Operation(error) => Some(error),
            Self::MaxRetriesExceeded { cause, .. }
            | Self::Timeout { cause, .. }
            | Self::EvaluatorMisuse { cause } => cause,
        }
    }

    /// Extract the error when the operation itself ended the run.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::Operation(error) => Some(error),
            _ => None,
        }
    }

    /// Returns true if the operation's error ended the run.
    pub fn is_operation(&self) -> bool {
        matches!(self, Self::Operation(_))
    }

    /// Returns true if the backoff strategy was exhausted.
    pub fn is_max_retries(&self) -> bool {
        matches!(self, Self::MaxRetriesExceeded { .. })
    }

    /// Returns true if the run timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns true if the evaluator was misused.
    pub fn is_evaluator_misuse(&self) -> bool {
        matches!(self, Self::EvaluatorMisuse { .. })
    }

    /// Map the carried operation error.
    pub fn map<F, E2>(self, f: F) -> RetryError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Self::Operation(error) => RetryError::Operation(f(error)),
            Self::MaxRetriesExceeded { attempts, cause } => RetryError::MaxRetriesExceeded {
                attempts,
                cause: cause.map(f),
            },
            Self::Timeout {
                timeout,
                attempts,
                cause,
            } => RetryError::Timeout {
                timeout,
                attempts,
                cause: cause.map(f),
            },
            Self::EvaluatorMisuse { cause } => RetryError::EvaluatorMisuse {
                cause: cause.map(f),
            },
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operation(error) => write!(f, "{}", error),
            Self::MaxRetriesExceeded { attempts, cause } => {
                write!(f, "max retries exceeded after {} attempts", attempts)?;
                if let Some(cause) = cause {
                    write!(f, ": {}", cause)?;
                }
                Ok(())
            }
            Self::Timeout { timeout, cause, .. } => {
                write!(f, "max timeout exceeded while retrying task: {:?}", timeout)?;
                if let Some(cause) = cause {
                    write!(f, ": {}", cause)?;
                }
                Ok(())
            }
            Self::EvaluatorMisuse { .. } => {
                write!(f, "result evaluator requested a retry without providing an error")
            }
        }
    }
}

impl<E: StdError + 'static> StdError for RetryError<E> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            // the operation error is presented as-is, not as a wrapper
            Self::Operation(error) => error.source(),
            _ => self.cause().map(|cause| cause as &(dyn StdError + 'static)),
        }
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;
    use std::io;

    #[test]
    fn test_max_retries_display() {
        let err = RetryError::MaxRetriesExceeded {
            attempts: 3,
            cause: Some("connection failed"),
        };
        let display = err.to_string();
        assert!(display.contains("max retries exceeded"));
        assert!(display.contains("3 attempts"));
        assert!(display.contains("connection failed"));
    }

    #[test]
    fn test_timeout_display_without_cause() {
        let err: RetryError<String> = RetryError::Timeout {
            timeout: Duration::from_secs(5),
            attempts: 0,
            cause: None,
        };
        assert_eq!(
            err.to_string(),
            "max timeout exceeded while retrying task: 5s"
        );
    }

    #[test]
    fn test_operation_display_is_transparent() {
        let err = RetryError::Operation("disk full");
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn test_cause_accessors() {
        let err = RetryError::EvaluatorMisuse {
            cause: Some("earlier failure"),
        };
        assert!(err.is_evaluator_misuse());
        assert_eq!(err.cause(), Some(&"earlier failure"));
        assert_eq!(err.clone().into_operation_error(), None);
        assert_eq!(err.into_cause(), Some("earlier failure"));

        let err = RetryError::Operation(7);
        assert!(err.is_operation());
        assert_eq!(err.into_operation_error(), Some(7));
    }

    #[test]
    fn test_source_chains_cause() {
        let err = RetryError::Timeout {
            timeout: Duration::from_millis(10),
            attempts: 2,
            cause: Some(io::Error::other("reset by peer")),
        };
        assert!(err.is_timeout());
        assert_eq!(err.source().unwrap().to_string(), "reset by peer");

        let err = RetryError::Operation(io::Error::other("no source"));
        assert!(err.source().is_none());
    }

    #[test]
    fn test_map() {
        let err = RetryError::MaxRetriesExceeded {
            attempts: 1,
            cause: Some(4),
        };
        assert_eq!(
            err.map(|n| n * 2),
            RetryError::MaxRetriesExceeded {
                attempts: 1,
                cause: Some(8)
            }
        );
    }
}
