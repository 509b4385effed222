//! Retry engines.
//!
//! [`Retrier`] and [`AsyncRetrier`] run an operation until it succeeds or
//! a terminal failure occurs:
//!
//! 1. if a timeout is configured and has passed, the run ends with
//!    [`RetryError::Timeout`]
//! 2. the operation is called; an accepted value ends the run
//! 3. a failure is classified; a terminal one ends the run with
//!    [`RetryError::Operation`]
//! 4. the backoff yields the next delay, or the run ends with
//!    [`RetryError::MaxRetriesExceeded`]
//! 5. the `on_retry` observer sees the error and delay
//! 6. the retrier sleeps, counts the retry and goes back to 1
//!
//! # Customizing decisions
//!
//! An *evaluator* inspects successful values and may turn them into
//! failures. An *error evaluator* replaces the classifier for failures and
//! may substitute a different error:
//!
//! ```rust
//! use persevere::backoff::ConstantBackoff;
//! use persevere::{ErrorVerdict, Retrier, RetryError};
//! use std::time::Duration;
//!
//! #[derive(Debug, PartialEq)]
//! enum ApiError {
//!     RateLimited,
//!     Forbidden,
//!     Fatal(String),
//! }
//!
//! # impl persevere::classify::Classify for ApiError {
//! #     fn category(&self) -> persevere::classify::ErrorCategory {
//! #         persevere::classify::ErrorCategory::OTHER
//! #     }
//! # }
//! let mut retrier = Retrier::<(), ApiError>::builder()
//!     .backoff(ConstantBackoff::new(Duration::ZERO, 3))
//!     .error_evaluator(|err: &ApiError| match err {
//!         ApiError::RateLimited => ErrorVerdict::Retry,
//!         ApiError::Forbidden => ErrorVerdict::Replace(ApiError::Fatal("check credentials".into())),
//!         ApiError::Fatal(_) => ErrorVerdict::Stop,
//!     })
//!     .build();
//!
//! let result = retrier.run(|| Err(ApiError::Forbidden));
//! assert_eq!(
//!     result,
//!     Err(RetryError::Operation(ApiError::Fatal("check credentials".into())))
//! );
//! ```
//!
//! # Wrapping functions
//!
//! [`retrying`] and [`retrying_async`] turn a plain function into one that
//! retries every call with a fresh retrier.

mod blocking;
mod engine;
mod error;
mod wrap;

#[cfg(feature = "async")]
mod async_retrier;

pub use blocking::{Retrier, RetrierBuilder};
pub use engine::{ErrorVerdict, Evaluation};
pub use error::RetryError;
pub use wrap::retrying;

#[cfg(feature = "async")]
pub use async_retrier::{AsyncRetrier, AsyncRetrierBuilder};
#[cfg(feature = "async")]
pub use wrap::retrying_async;
