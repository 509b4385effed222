//! The blocking retrier.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::engine::{normalize_timeout, Attempt, ErrorVerdict, Evaluation, RunState, Settings};
use super::error::RetryError;
use crate::backoff::Backoff;
use crate::classify::{Classify, ErrorBlacklist, ErrorPolicy, ErrorWhitelist};
use crate::clock::{self, Clock};
use crate::config::RetryConfig;
use crate::error::ConfigError;

type Evaluator<T, E> = Box<dyn Fn(&T) -> Evaluation<E> + Send + Sync>;
type ErrorEvaluator<E> = Box<dyn Fn(&E) -> ErrorVerdict<E> + Send + Sync>;
type RetryObserver<E> = Box<dyn Fn(&E, Duration) -> Result<(), E> + Send + Sync>;
type Sleeper = Box<dyn Fn(Duration) + Send + Sync>;

/// Retries a blocking operation on the caller's thread.
///
/// A retrier owns its backoff strategy and remembers the outcome of the
/// last run: [`attempts`](Self::attempts) is the number of retries made
/// and [`error`](Self::error) the last recorded failure while a run is in
/// flight. Each call to [`run`](Self::run) starts from a clean state.
///
/// # Examples
///
/// ```rust
/// use persevere::backoff::ConstantBackoff;
/// use persevere::Retrier;
/// use std::time::Duration;
///
/// let mut calls = 0;
/// let mut retrier = Retrier::builder()
///     .backoff(ConstantBackoff::new(Duration::ZERO, 5))
///     .build();
///
/// let value = retrier.run(|| {
///     calls += 1;
///     if calls < 4 {
///         Err("not yet")
///     } else {
///         Ok(42)
///     }
/// });
///
/// assert_eq!(value, Ok(42));
/// assert_eq!(retrier.attempts(), 3);
/// assert!(retrier.error().is_none());
/// ```
pub struct Retrier<T, E> {
    settings: Settings,
    evaluator: Option<Evaluator<T, E>>,
    error_evaluator: Option<ErrorEvaluator<E>>,
    on_retry: Option<RetryObserver<E>>,
    sleep: Sleeper,
    clock: Arc<dyn Clock>,
    state: RunState<E>,
}

impl<T, E> Retrier<T, E> {
    /// A retrier with the default backoff and whitelist.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a retrier.
    pub fn builder() -> RetrierBuilder<T, E> {
        RetrierBuilder::new()
    }

    /// Retries performed by the current or most recent run.
    pub fn attempts(&self) -> u32 {
        self.state.attempts
    }

    /// The last recorded failure of the current run, if any.
    ///
    /// Cleared on success; a run that ends in failure moves the error into
    /// the returned [`RetryError`].
    pub fn error(&self) -> Option<&E> {
        self.state.error.as_ref()
    }

    /// The overall timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.settings.timeout
    }

    /// The backoff strategy.
    pub fn backoff(&self) -> &dyn Backoff {
        self.settings.backoff.as_ref()
    }

    /// The error classifier.
    pub fn policy(&self) -> &ErrorPolicy {
        &self.settings.policy
    }

    /// Run `operation` until it succeeds or a terminal failure occurs.
    ///
    /// Returns the first accepted value, or the [`RetryError`] describing
    /// why the run ended.
    pub fn run<F>(&mut self, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
        E: Classify,
    {
        self.state.begin(self.settings.backoff.as_mut());
        let started = self.clock.now();

        loop {
            if let Some(timeout) = self.settings.timeout {
                if self.clock.since(started) > timeout {
                    return Err(self.state.timed_out(timeout));
                }
            }

            let error = match operation() {
                Ok(value) => {
                    let evaluation = self.evaluator.as_ref().map(|evaluate| evaluate(&value));
                    match self.state.settle(value, evaluation) {
                        Attempt::Done(result) => return result,
                        Attempt::Failed(error) => error,
                    }
                }
                Err(error) => error,
            };

            let verdict = match &self.error_evaluator {
                Some(evaluate) => evaluate(&error),
                None => self.settings.policy.is_retryable(&error).into(),
            };
            self.state.judge(error, verdict)?;

            let delay = self.state.next_delay(self.settings.backoff.as_mut())?;

            let observed = match (&self.on_retry, &self.state.error) {
                (Some(observer), Some(error)) => observer(error, delay),
                _ => Ok(()),
            };
            self.state.observed(observed)?;

            (self.sleep)(delay);
            self.state.retrying(delay);
        }
    }

    /// Run `operation` with a clone of `args` on every attempt.
    ///
    /// ```rust
    /// use persevere::backoff::ConstantBackoff;
    /// use persevere::Retrier;
    /// use std::time::Duration;
    ///
    /// let mut retrier = Retrier::<usize, String>::builder()
    ///     .backoff(ConstantBackoff::new(Duration::ZERO, 3))
    ///     .build();
    ///
    /// let len = retrier.run_with(|name: String| Ok(name.len()), "ferris".to_string());
    /// assert_eq!(len, Ok(6));
    /// ```
    pub fn run_with<A, F>(&mut self, mut operation: F, args: A) -> Result<T, RetryError<E>>
    where
        A: Clone,
        F: FnMut(A) -> Result<T, E>,
        E: Classify,
    {
        self.run(|| operation(args.clone()))
    }

    /// Run `body` against this retrier with a freshly reset state.
    ///
    /// The state is reset before `body` runs; whatever `body` leaves behind
    /// stays readable afterwards through [`attempts`](Self::attempts) and
    /// [`error`](Self::error).
    pub fn scoped<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> R {
        self.state = RunState::default();

        #[cfg(feature = "tracing")]
        let span = tracing::debug_span!("retry_scope");
        #[cfg(feature = "tracing")]
        let _guard = span.enter();

        body(self)
    }
}

impl<T, E> Default for Retrier<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for Retrier<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrier")
            .field("timeout", &self.settings.timeout)
            .field("backoff", &self.settings.backoff)
            .field("policy", &self.settings.policy)
            .field("evaluator", &self.evaluator.is_some())
            .field("error_evaluator", &self.error_evaluator.is_some())
            .field("on_retry", &self.on_retry.is_some())
            .field("attempts", &self.state.attempts)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Retrier`].
pub struct RetrierBuilder<T, E> {
    settings: Settings,
    evaluator: Option<Evaluator<T, E>>,
    error_evaluator: Option<ErrorEvaluator<E>>,
    on_retry: Option<RetryObserver<E>>,
    sleep: Sleeper,
    clock: Arc<dyn Clock>,
}

impl<T, E> RetrierBuilder<T, E> {
    fn new() -> Self {
        Self {
            settings: Settings::default(),
            evaluator: None,
            error_evaluator: None,
            on_retry: None,
            sleep: Box::new(thread::sleep),
            clock: clock::system(),
        }
    }

    /// Give up once a run has taken longer than `timeout`.
    ///
    /// `Duration::ZERO` disables the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = normalize_timeout(timeout);
        self
    }

    /// The strategy producing delays between attempts.
    pub fn backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.settings.backoff = Box::new(backoff);
        self
    }

    /// Retry everything except the whitelisted categories.
    pub fn whitelist(mut self, whitelist: ErrorWhitelist) -> Self {
        self.settings.policy = ErrorPolicy::Whitelist(whitelist);
        self
    }

    /// Retry only the blacklisted categories.
    pub fn blacklist(mut self, blacklist: ErrorBlacklist) -> Self {
        self.settings.policy = ErrorPolicy::Blacklist(blacklist);
        self
    }

    /// Use an already-built classifier.
    pub fn policy(mut self, policy: impl Into<ErrorPolicy>) -> Self {
        self.settings.policy = policy.into();
        self
    }

    /// Apply the timeout and backoff from a [`RetryConfig`].
    pub fn with_config(mut self, config: &RetryConfig) -> Result<Self, ConfigError> {
        self.settings.timeout = config.timeout()?;
        self.settings.backoff = config.backoff.build()?;
        Ok(self)
    }

    /// Replace the sleep function, by default [`std::thread::sleep`].
    pub fn sleep<F>(mut self, sleep: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.sleep = Box::new(sleep);
        self
    }

    /// Measure the timeout against `clock`.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Finish building.
    pub fn build(self) -> Retrier<T, E> {
        Retrier {
            settings: self.settings,
            evaluator: self.evaluator,
            error_evaluator: self.error_evaluator,
            on_retry: self.on_retry,
            sleep: self.sleep,
            clock: self.clock,
            state: RunState::default(),
        }
    }
}

impl<T: 'static, E: 'static> RetrierBuilder<T, E> {
    /// Inspect every successful value.
    ///
    /// The closure may return a `bool`, an `Option<E>`, a `Result<(), E>`
    /// or an [`Evaluation`]. Returning an error turns the value into a
    /// failure that goes through error classification.
    ///
    /// ```rust
    /// use persevere::backoff::ConstantBackoff;
    /// use persevere::Retrier;
    /// use std::time::Duration;
    ///
    /// let mut responses = vec![200, 503, 503].into_iter().rev();
    /// let mut retrier = Retrier::<u16, &str>::builder()
    ///     .backoff(ConstantBackoff::new(Duration::ZERO, 5))
    ///     .evaluator(|status: &u16| (*status >= 500).then_some("server error"))
    ///     .build();
    ///
    /// assert_eq!(retrier.run(|| Ok(responses.next().unwrap())), Ok(200));
    /// assert_eq!(retrier.attempts(), 2);
    /// ```
    pub fn evaluator<F, R>(mut self, evaluator: F) -> Self
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: Into<Evaluation<E>> + 'static,
    {
        self.evaluator = Some(Box::new(move |value: &T| -> Evaluation<E> {
            evaluator(value).into()
        }));
        self
    }

    /// Decide per error whether to retry, replacing the classifier.
    ///
    /// The closure may return a `bool` (`true` retries) or an
    /// [`ErrorVerdict`].
    pub fn error_evaluator<F, R>(mut self, evaluator: F) -> Self
    where
        F: Fn(&E) -> R + Send + Sync + 'static,
        R: Into<ErrorVerdict<E>> + 'static,
    {
        self.error_evaluator = Some(Box::new(move |error: &E| -> ErrorVerdict<E> {
            evaluator(error).into()
        }));
        self
    }

    /// Observe every scheduled retry with the error and upcoming delay.
    ///
    /// Returning an error stops the run with that error.
    pub fn on_retry<F>(mut self, observer: F) -> Self
    where
        F: Fn(&E, Duration) -> Result<(), E> + Send + Sync + 'static,
    {
        self.on_retry = Some(Box::new(observer));
        self
    }
}

impl<T, E> fmt::Debug for RetrierBuilder<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrierBuilder")
            .field("timeout", &self.settings.timeout)
            .field("backoff", &self.settings.backoff)
            .field("policy", &self.settings.policy)
            .finish_non_exhaustive()
    }
}
