//! Retry settings as plain data.
//!
//! [`RetryConfig`] describes a timeout and a backoff strategy with plain
//! numbers, so retry behavior can live in a configuration file. With the
//! `serde` feature the types derive `Serialize` and `Deserialize`; the
//! backoff is tagged by `strategy`:
//!
//! ```json
//! {
//!   "timeout_secs": 30.0,
//!   "backoff": { "strategy": "exponential", "interval_ms": 200, "factor": 0.25 }
//! }
//! ```
//!
//! Numbers are validated when the config is applied, never while retrying.
//!
//! ```rust
//! use persevere::config::{BackoffConfig, RetryConfig};
//! use persevere::Retrier;
//!
//! let config = RetryConfig {
//!     timeout_secs: Some(5.0),
//!     backoff: BackoffConfig::Constant { interval_ms: 0, retries: 3 },
//! };
//!
//! let mut retrier = Retrier::<(), &str>::builder()
//!     .with_config(&config)
//!     .unwrap()
//!     .build();
//!
//! assert!(retrier.run(|| Err("nope")).unwrap_err().is_max_retries());
//! assert_eq!(retrier.attempts(), 3);
//! ```

use std::time::Duration;

use crate::backoff::{Backoff, ConstantBackoff, ExponentialBackoff, FibonacciBackoff};
use crate::error::ConfigError;

/// Timeout and backoff settings for a retrier.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryConfig {
    /// Overall timeout in seconds; `None` or `0` disables it.
    #[cfg_attr(feature = "serde", serde(default))]
    pub timeout_secs: Option<f64>,
    /// The backoff strategy.
    #[cfg_attr(feature = "serde", serde(default))]
    pub backoff: BackoffConfig,
}

impl RetryConfig {
    /// Check every parameter without building anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timeout()?;
        self.backoff.validate()
    }

    /// The configured timeout, with zero mapped to none.
    pub fn timeout(&self) -> Result<Option<Duration>, ConfigError> {
        match self.timeout_secs {
            None => Ok(None),
            Some(secs) => {
                let secs = ConfigError::check_non_negative("timeout_secs", secs)?;
                let timeout = Duration::try_from_secs_f64(secs)
                    .map_err(|_| ConfigError::not_finite("timeout_secs", secs))?;
                Ok((!timeout.is_zero()).then_some(timeout))
            }
        }
    }
}

/// A backoff strategy described by plain numbers.
///
/// A `retries` of zero means unlimited.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "strategy", rename_all = "snake_case"))]
pub enum BackoffConfig {
    /// See [`ConstantBackoff`].
    Constant {
        /// Delay between attempts, in milliseconds.
        interval_ms: u64,
        /// Retry budget.
        retries: u32,
    },
    /// See [`FibonacciBackoff`].
    Fibonacci {
        /// First sequence term.
        #[cfg_attr(feature = "serde", serde(default = "default_fibonacci_initial"))]
        initial: u64,
        /// Duration of one sequence unit, in milliseconds.
        multiplier_ms: u64,
        /// Retry budget.
        retries: u32,
    },
    /// See [`ExponentialBackoff`]. Omitted fields take the strategy defaults.
    Exponential {
        /// Starting interval, in milliseconds.
        #[cfg_attr(feature = "serde", serde(default))]
        interval_ms: Option<u64>,
        /// Randomization factor, clamped to `[0, 1]`.
        #[cfg_attr(feature = "serde", serde(default))]
        factor: Option<f64>,
        /// Interval growth per attempt.
        #[cfg_attr(feature = "serde", serde(default))]
        multiplier: Option<f64>,
        /// Interval cap, in milliseconds.
        #[cfg_attr(feature = "serde", serde(default))]
        max_interval_ms: Option<u64>,
        /// Elapsed-time budget, in milliseconds.
        #[cfg_attr(feature = "serde", serde(default))]
        max_elapsed_ms: Option<u64>,
    },
}

#[cfg(feature = "serde")]
fn default_fibonacci_initial() -> u64 {
    1
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::Constant {
            interval_ms: ConstantBackoff::DEFAULT_INTERVAL.as_millis() as u64,
            retries: ConstantBackoff::DEFAULT_RETRIES,
        }
    }
}

impl BackoffConfig {
    /// Check every parameter without building anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.build().map(|_| ())
    }

    /// Build the described strategy.
    pub fn build(&self) -> Result<Box<dyn Backoff>, ConfigError> {
        let backoff: Box<dyn Backoff> = match *self {
            Self::Constant {
                interval_ms,
                retries,
            } => Box::new(ConstantBackoff::new(
                Duration::from_millis(interval_ms),
                retries,
            )),
            Self::Fibonacci {
                initial,
                multiplier_ms,
                retries,
            } => Box::new(FibonacciBackoff::with_initial(
                initial,
                Duration::from_millis(multiplier_ms),
                retries,
            )),
            Self::Exponential {
                interval_ms,
                factor,
                multiplier,
                max_interval_ms,
                max_elapsed_ms,
            } => {
                let mut builder = ExponentialBackoff::builder();
                if let Some(ms) = interval_ms {
                    builder = builder.interval(Duration::from_millis(ms));
                }
                if let Some(factor) = factor {
                    builder = builder.factor(factor);
                }
                if let Some(multiplier) = multiplier {
                    builder = builder.multiplier(multiplier);
                }
                if let Some(ms) = max_interval_ms {
                    builder = builder.max_interval(Duration::from_millis(ms));
                }
                if let Some(ms) = max_elapsed_ms {
                    builder = builder.max_elapsed(Duration::from_millis(ms));
                }
                Box::new(builder.build()?)
            }
        };
        Ok(backoff)
    }
}
