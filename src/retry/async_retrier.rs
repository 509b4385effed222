//! The async retrier.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use futures::future::{self, BoxFuture};
use futures::FutureExt;

use super::engine::{normalize_timeout, Attempt, ErrorVerdict, Evaluation, RunState, Settings};
use super::error::RetryError;
use crate::backoff::Backoff;
use crate::classify::{Classify, ErrorBlacklist, ErrorPolicy, ErrorWhitelist};
use crate::config::RetryConfig;
use crate::error::ConfigError;

type Evaluator<T, E> = Box<dyn Fn(&T) -> BoxFuture<'static, Evaluation<E>> + Send + Sync>;
type ErrorEvaluator<E> = Box<dyn Fn(&E) -> BoxFuture<'static, ErrorVerdict<E>> + Send + Sync>;
type RetryObserver<E> =
    Box<dyn Fn(&E, Duration) -> BoxFuture<'static, Result<(), E>> + Send + Sync>;
type Sleeper = Box<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

/// Retries an async operation.
///
/// Behaves like [`Retrier`](crate::Retrier), awaiting the operation, the
/// hooks and the sleep between attempts. A configured timeout bounds the
/// whole run through [`tokio::time::timeout`]: when it fires, the attempt
/// in flight is dropped and the run ends with [`RetryError::Timeout`]
/// carrying the last recorded error.
///
/// Hooks return `'static` futures; clone whatever they need out of the
/// borrowed value before the `async` block.
///
/// # Examples
///
/// ```rust
/// use persevere::backoff::ConstantBackoff;
/// use persevere::AsyncRetrier;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let mut calls = 0;
/// let mut retrier = AsyncRetrier::builder()
///     .backoff(ConstantBackoff::new(Duration::ZERO, 5))
///     .build();
///
/// let value = retrier
///     .run(|| {
///         calls += 1;
///         let calls = calls;
///         async move {
///             if calls < 3 {
///                 Err("not yet")
///             } else {
///                 Ok(calls)
///             }
///         }
///     })
///     .await;
///
/// assert_eq!(value, Ok(3));
/// assert_eq!(retrier.attempts(), 2);
/// # });
/// ```
pub struct AsyncRetrier<T, E> {
    settings: Settings,
    evaluator: Option<Evaluator<T, E>>,
    error_evaluator: Option<ErrorEvaluator<E>>,
    on_retry: Option<RetryObserver<E>>,
    sleep: Sleeper,
    state: RunState<E>,
}

impl<T, E> AsyncRetrier<T, E> {
    /// An async retrier with the default backoff and whitelist.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring an async retrier.
    pub fn builder() -> AsyncRetrierBuilder<T, E> {
        AsyncRetrierBuilder::new()
    }

    /// Retries performed by the current or most recent run.
    pub fn attempts(&self) -> u32 {
        self.state.attempts
    }

    /// The last recorded failure of the current run, if any.
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
    pub async fn run<F, Fut>(&mut self, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        self.state.begin(self.settings.backoff.as_mut());

        let Some(timeout) = self.settings.timeout else {
            return self.attempt_loop(&mut operation).await;
        };

        let outcome = tokio::time::timeout(timeout, self.attempt_loop(&mut operation)).await;
        match outcome {
            Ok(result) => result,
            Err(_elapsed) => Err(self.state.timed_out(timeout)),
        }
    }

    /// Run `operation` with a clone of `args` on every attempt.
    pub async fn run_with<A, F, Fut>(
        &mut self,
        mut operation: F,
        args: A,
    ) -> Result<T, RetryError<E>>
    where
        A: Clone,
        F: FnMut(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        self.run(|| operation(args.clone())).await
    }

    /// Run `body` against this retrier with a freshly reset state.
    ///
    /// ```rust
    /// use futures::FutureExt;
    /// use persevere::backoff::ConstantBackoff;
    /// use persevere::AsyncRetrier;
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// let mut retrier = AsyncRetrier::<(), &str>::builder()
    ///     .backoff(ConstantBackoff::new(Duration::ZERO, 2))
    ///     .build();
    ///
    /// let result = retrier
    ///     .scoped(|retrier| async move { retrier.run(|| async { Err("down") }).await }.boxed())
    ///     .await;
    ///
    /// assert!(result.unwrap_err().is_max_retries());
    /// assert_eq!(retrier.attempts(), 2);
    /// # });
    /// ```
    pub async fn scoped<R, B>(&mut self, body: B) -> R
    where
        B: for<'a> FnOnce(&'a mut Self) -> BoxFuture<'a, R>,
    {
        self.state = RunState::default();

        #[cfg(feature = "tracing")]
        {
            use tracing::Instrument;
            body(self)
                .instrument(tracing::debug_span!("retry_scope"))
                .await
        }
        #[cfg(not(feature = "tracing"))]
        {
            body(self).await
        }
    }

    async fn attempt_loop<F, Fut>(&mut self, operation: &mut F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        loop {
            let error = match operation().await {
                Ok(value) => {
                    let evaluating = self.evaluator.as_ref().map(|evaluate| evaluate(&value));
                    let evaluation = match evaluating {
                        Some(evaluating) => Some(evaluating.await),
                        None => None,
                    };
                    match self.state.settle(value, evaluation) {
                        Attempt::Done(result) => return result,
                        Attempt::Failed(error) => error,
                    }
                }
                Err(error) => error,
            };

            let judging = self.error_evaluator.as_ref().map(|evaluate| evaluate(&error));
            let verdict = match judging {
                Some(judging) => judging.await,
                None => self.settings.policy.is_retryable(&error).into(),
            };
            self.state.judge(error, verdict)?;

            let delay = self.state.next_delay(self.settings.backoff.as_mut())?;

            let observing = match (&self.on_retry, &self.state.error) {
                (Some(observer), Some(error)) => Some(observer(error, delay)),
                _ => None,
            };
            let observed = match observing {
                Some(observing) => observing.await,
                None => Ok(()),
            };
            self.state.observed(observed)?;

            (self.sleep)(delay).await;
            self.state.retrying(delay);
        }
    }
}

impl<T, E> Default for AsyncRetrier<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for AsyncRetrier<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncRetrier")
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

/// Builder for [`AsyncRetrier`].
pub struct AsyncRetrierBuilder<T, E> {
    settings: Settings,
    evaluator: Option<Evaluator<T, E>>,
    error_evaluator: Option<ErrorEvaluator<E>>,
    on_retry: Option<RetryObserver<E>>,
    sleep: Sleeper,
}

impl<T, E> AsyncRetrierBuilder<T, E> {
    fn new() -> Self {
        Self {
            settings: Settings::default(),
            evaluator: None,
            error_evaluator: None,
            on_retry: None,
            sleep: Box::new(|delay| tokio::time::sleep(delay).boxed()),
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

    /// Replace the sleep function, by default [`tokio::time::sleep`].
    pub fn sleep<F>(mut self, sleep: F) -> Self
    where
        F: Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.sleep = Box::new(sleep);
        self
    }

    /// Finish building.
    pub fn build(self) -> AsyncRetrier<T, E> {
        AsyncRetrier {
            settings: self.settings,
            evaluator: self.evaluator,
            error_evaluator: self.error_evaluator,
            on_retry: self.on_retry,
            sleep: self.sleep,
            state: RunState::default(),
        }
    }
}

impl<T: 'static, E: Send + 'static> AsyncRetrierBuilder<T, E> {
    /// Inspect every successful value synchronously.
    ///
    /// Accepts the same return types as
    /// [`RetrierBuilder::evaluator`](crate::RetrierBuilder::evaluator).
    pub fn evaluator<F, R>(mut self, evaluator: F) -> Self
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: Into<Evaluation<E>> + 'static,
    {
        self.evaluator = Some(Box::new(
            move |value: &T| -> BoxFuture<'static, Evaluation<E>> {
                future::ready(evaluator(value).into()).boxed()
            },
        ));
        self
    }

    /// Inspect every successful value with an async function.
    ///
    /// ```rust
    /// use persevere::backoff::ConstantBackoff;
    /// use persevere::AsyncRetrier;
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// let mut retrier = AsyncRetrier::<String, &str>::builder()
    ///     .backoff(ConstantBackoff::new(Duration::ZERO, 2))
    ///     .async_evaluator(|body: &String| {
    ///         let empty = body.is_empty();
    ///         async move { empty.then_some("empty body") }
    ///     })
    ///     .build();
    ///
    /// let result = retrier.run(|| async { Ok(String::new()) }).await;
    /// assert!(result.unwrap_err().is_max_retries());
    /// # });
    /// ```
    pub fn async_evaluator<F, Fut, R>(mut self, evaluator: F) -> Self
    where
        F: Fn(&T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Evaluation<E>> + 'static,
    {
        self.evaluator = Some(Box::new(
            move |value: &T| -> BoxFuture<'static, Evaluation<E>> {
                evaluator(value).map(Into::into).boxed()
            },
        ));
        self
    }

    /// Decide per error whether to retry, replacing the classifier.
    pub fn error_evaluator<F, R>(mut self, evaluator: F) -> Self
    where
        F: Fn(&E) -> R + Send + Sync + 'static,
        R: Into<ErrorVerdict<E>> + 'static,
    {
        self.error_evaluator = Some(Box::new(
            move |error: &E| -> BoxFuture<'static, ErrorVerdict<E>> {
                future::ready(evaluator(error).into()).boxed()
            },
        ));
        self
    }

    /// Decide per error with an async function whether to retry.
    pub fn async_error_evaluator<F, Fut, R>(mut self, evaluator: F) -> Self
    where
        F: Fn(&E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<ErrorVerdict<E>> + 'static,
    {
        self.error_evaluator = Some(Box::new(
            move |error: &E| -> BoxFuture<'static, ErrorVerdict<E>> {
                evaluator(error).map(Into::into).boxed()
            },
        ));
        self
    }

    /// Observe every scheduled retry with the error and upcoming delay.
    ///
    /// Returning an error stops the run with that error.
    pub fn on_retry<F>(mut self, observer: F) -> Self
    where
        F: Fn(&E, Duration) -> Result<(), E> + Send + Sync + 'static,
    {
        self.on_retry = Some(Box::new(
            move |error: &E, delay: Duration| -> BoxFuture<'static, Result<(), E>> {
                future::ready(observer(error, delay)).boxed()
            },
        ));
        self
    }

    /// Observe every scheduled retry with an async function.
    pub fn async_on_retry<F, Fut>(mut self, observer: F) -> Self
    where
        F: Fn(&E, Duration) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        self.on_retry = Some(Box::new(
            move |error: &E, delay: Duration| -> BoxFuture<'static, Result<(), E>> {
                observer(error, delay).boxed()
            },
        ));
        self
    }
}

impl<T, E> fmt::Debug for AsyncRetrierBuilder<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncRetrierBuilder")
            .field("timeout", &self.settings.timeout)
            .field("backoff", &self.settings.backoff)
            .field("policy", &self.settings.policy)
            .finish_non_exhaustive()
    }
}
