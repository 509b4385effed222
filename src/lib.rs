//! # Persevere
//!
//! Retry fallible operations with pluggable backoff strategies and error
//! classification.
//!
//! A retry run calls an operation until it succeeds or a terminal failure
//! occurs. Three pieces decide what happens in between:
//!
//! - a [`Backoff`](backoff::Backoff) strategy yields the delay before each
//!   retry, or stops the run once its budget is spent
//! - an [`ErrorPolicy`](classify::ErrorPolicy) classifies each failure as
//!   retryable or terminal, by the error's [`ErrorCategory`](classify::ErrorCategory)
//! - optional evaluators and an `on_retry` observer let the caller reclassify
//!   results and errors, or watch every retry
//!
//! [`Retrier`] runs blocking operations on the caller's thread;
//! [`AsyncRetrier`] (feature `async`, on by default) runs async ones on tokio.
//! Both share the same state machine and produce the same outcomes.
//!
//! ## Quick Example
//!
//! ```rust
//! use persevere::backoff::FibonacciBackoff;
//! use persevere::classify::NotRetriable;
//! use persevere::{Retrier, RetryError};
//! use std::time::Duration;
//!
//! let mut retrier = Retrier::<u32, NotRetriable>::builder()
//!     .backoff(FibonacciBackoff::new(Duration::ZERO, 5))
//!     .build();
//!
//! // Transient failures are retried
//! let mut calls = 0;
//! let value = retrier.run(|| {
//!     calls += 1;
//!     if calls < 3 {
//!         Err(NotRetriable::new("flaky").retrying())
//!     } else {
//!         Ok(calls)
//!     }
//! });
//! assert_eq!(value, Ok(3));
//!
//! // Terminal failures end the run immediately
//! let result = retrier.run(|| Err(NotRetriable::new("bad credentials")));
//! assert!(matches!(result, Err(RetryError::Operation(_))));
//! assert_eq!(retrier.attempts(), 0);
//! ```
//!
//! ## Features
//!
//! - `async` (default): [`AsyncRetrier`] and [`retrying_async`]
//! - `tracing` (default): retry scheduling and failures are logged through
//!   `tracing`
//! - `serde`: `Serialize`/`Deserialize` for [`config::RetryConfig`]

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod backoff;
pub mod classify;
pub mod clock;
pub mod config;
pub mod error;
pub mod retry;
pub mod testing;

// Re-exports
pub use error::ConfigError;
pub use retry::{
    retrying, ErrorVerdict, Evaluation, Retrier, RetrierBuilder, RetryError,
};

#[cfg(feature = "async")]
pub use retry::{retrying_async, AsyncRetrier, AsyncRetrierBuilder};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backoff::{Backoff, ConstantBackoff, ExponentialBackoff, FibonacciBackoff};
    pub use crate::classify::{
        Categorized, Classify, ErrorBlacklist, ErrorCategory, ErrorWhitelist, NotRetriable,
    };
    pub use crate::error::ConfigError;
    pub use crate::retry::{retrying, ErrorVerdict, Evaluation, Retrier, RetryError};

    #[cfg(feature = "async")]
    pub use crate::retry::{retrying_async, AsyncRetrier};
}
