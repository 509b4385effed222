//! The attempt state machine shared by the blocking and async retriers.
//!
//! Each retrier drives its own loop (direct calls or `.await`s) and hands
//! every decision to [`RunState`], so both execution modes terminate, count
//! attempts and record errors identically.

use std::time::Duration;

use super::error::RetryError;
use crate::backoff::{Backoff, ConstantBackoff};
use crate::classify::ErrorPolicy;

/// What a result evaluator concluded about a successful return value.
///
/// Converts from `bool` (`false` accepts, `true` is [`Retry`](Self::Retry)),
/// from `Option<E>` and from `Result<(), E>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation<E> {
    /// The value is good; the run succeeds.
    Accept,
    /// Treat the value as a failure with this error.
    Fail(E),
    /// Asks for a retry without an error to record. This is a misuse and
    /// ends the run with [`RetryError::EvaluatorMisuse`].
    Retry,
}

impl<E> From<bool> for Evaluation<E> {
    fn from(retry: bool) -> Self {
        if retry {
            Self::Retry
        } else {
            Self::Accept
        }
    }
}

impl<E> From<Option<E>> for Evaluation<E> {
    fn from(error: Option<E>) -> Self {
        match error {
            Some(error) => Self::Fail(error),
            None => Self::Accept,
        }
    }
}

impl<E> From<Result<(), E>> for Evaluation<E> {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::Accept,
            Err(error) => Self::Fail(error),
        }
    }
}

/// What an error evaluator concluded about a failure.
///
/// Converts from `bool`: `true` retries, `false` stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorVerdict<E> {
    /// Retry the operation.
    Retry,
    /// Stop and return the original error.
    Stop,
    /// Stop and return this error instead of the original.
    Replace(E),
}

impl<E> From<bool> for ErrorVerdict<E> {
    fn from(retry: bool) -> Self {
        if retry {
            Self::Retry
        } else {
            Self::Stop
        }
    }
}

/// Outcome of a single settled attempt.
pub(crate) enum Attempt<T, E> {
    /// The run is over.
    Done(Result<T, RetryError<E>>),
    /// The attempt failed and the error needs judging.
    Failed(E),
}

/// Configuration shared by both retrier flavors.
#[derive(Debug)]
pub(crate) struct Settings {
    pub(crate) timeout: Option<Duration>,
    pub(crate) backoff: Box<dyn Backoff>,
    pub(crate) policy: ErrorPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout: None,
            backoff: Box::new(ConstantBackoff::default()),
            policy: ErrorPolicy::default(),
        }
    }
}

/// A zero timeout means no timeout.
pub(crate) fn normalize_timeout(timeout: Duration) -> Option<Duration> {
    (!timeout.is_zero()).then_some(timeout)
}

/// Per-run bookkeeping.
#[derive(Debug)]
pub(crate) struct RunState<E> {
    pub(crate) attempts: u32,
    pub(crate) error: Option<E>,
}

impl<E> Default for RunState<E> {
    fn default() -> Self {
        Self {
            attempts: 0,
            error: None,
        }
    }
}

impl<E> RunState<E> {
    /// Reset for a new run and rewind the backoff.
    pub(crate) fn begin(&mut self, backoff: &mut dyn Backoff) {
        self.attempts = 0;
        self.error = None;
        backoff.reset();

        #[cfg(feature = "tracing")]
        tracing::trace!("starting retry run");
    }

    /// Fold the evaluator's opinion of a returned value into the run.
    pub(crate) fn settle<T>(
        &mut self,
        value: T,
        evaluation: Option<Evaluation<E>>,
    ) -> Attempt<T, E> {
        match evaluation.unwrap_or(Evaluation::Accept) {
            Evaluation::Accept => {
                self.error = None;

                #[cfg(feature = "tracing")]
                tracing::trace!(attempts = self.attempts, "retry run succeeded");

                Attempt::Done(Ok(value))
            }
            Evaluation::Fail(error) => Attempt::Failed(error),
            Evaluation::Retry => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    attempts = self.attempts,
                    "result evaluator requested a retry without an error"
                );

                Attempt::Done(Err(RetryError::EvaluatorMisuse {
                    cause: self.error.take(),
                }))
            }
        }
    }

    /// Record a failed attempt and apply the error evaluator's verdict.
    pub(crate) fn judge(
        &mut self,
        error: E,
        verdict: ErrorVerdict<E>,
    ) -> Result<(), RetryError<E>> {
        match verdict {
            ErrorVerdict::Retry => {
                self.error = Some(error);
                Ok(())
            }
            ErrorVerdict::Stop => {
                #[cfg(feature = "tracing")]
                tracing::debug!(attempts = self.attempts, "error is not retryable");

                self.error = None;
                Err(RetryError::Operation(error))
            }
            ErrorVerdict::Replace(replacement) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    attempts = self.attempts,
                    "error evaluator replaced the error"
                );

                drop(error);
                self.error = None;
                Err(RetryError::Operation(replacement))
            }
        }
    }

    /// Ask the backoff for the next delay.
    pub(crate) fn next_delay(
        &mut self,
        backoff: &mut dyn Backoff,
    ) -> Result<Duration, RetryError<E>> {
        match backoff.next() {
            Some(delay) => Ok(delay),
            None => {
                #[cfg(feature = "tracing")]
                tracing::warn!(attempts = self.attempts, "max retries exceeded");

                Err(RetryError::MaxRetriesExceeded {
                    attempts: self.attempts,
                    cause: self.error.take(),
                })
            }
        }
    }

    /// Apply the retry observer's outcome.
    pub(crate) fn observed(&mut self, outcome: Result<(), E>) -> Result<(), RetryError<E>> {
        outcome.map_err(|error| {
            #[cfg(feature = "tracing")]
            tracing::debug!(attempts = self.attempts, "retry observer aborted the run");

            self.error = None;
            RetryError::Operation(error)
        })
    }

    /// Count a retry about to start.
    pub(crate) fn retrying(&mut self, delay: Duration) {
        self.attempts += 1;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            attempt = self.attempts,
            delay_ms = delay.as_millis() as u64,
            "retrying operation"
        );
        #[cfg(not(feature = "tracing"))]
        let _ = delay;
    }

    /// The failure to report once the deadline has passed.
    pub(crate) fn timed_out(&mut self, timeout: Duration) -> RetryError<E> {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            attempts = self.attempts,
            timeout_ms = timeout.as_millis() as u64,
            "max timeout exceeded while retrying"
        );

        RetryError::Timeout {
            timeout,
            attempts: self.attempts,
            cause: self.error.take(),
        }
    }
}
