//! Wrapping plain functions into retrying ones.
//!
//! Each call of a wrapped function builds a fresh retrier from the factory,
//! so concurrent or repeated calls never share attempt counts or backoff
//! state.

use super::blocking::Retrier;
use super::error::RetryError;
use crate::classify::Classify;

#[cfg(feature = "async")]
use super::async_retrier::AsyncRetrier;
#[cfg(feature = "async")]
use futures::future::BoxFuture;
#[cfg(feature = "async")]
use futures::FutureExt;
#[cfg(feature = "async")]
use std::future::Future;

/// Wrap `operation` so every call is retried by a retrier from
/// `make_retrier`.
///
/// # Examples
///
/// ```rust
/// use persevere::backoff::ConstantBackoff;
/// use persevere::{retrying, Retrier};
/// use std::time::Duration;
///
/// let mut failures_left = 2;
/// let mut fetch = retrying(
///     || {
///         Retrier::builder()
///             .backoff(ConstantBackoff::new(Duration::ZERO, 3))
///             .build()
///     },
///     move |id: u32| {
///         if failures_left > 0 {
///             failures_left -= 1;
///             Err("busy")
///         } else {
///             Ok(id * 10)
///         }
///     },
/// );
///
/// assert_eq!(fetch(4), Ok(40));
/// ```
pub fn retrying<T, E, A, M, F>(
    make_retrier: M,
    mut operation: F,
) -> impl FnMut(A) -> Result<T, RetryError<E>>
where
    M: Fn() -> Retrier<T, E>,
    F: FnMut(A) -> Result<T, E>,
    A: Clone,
    E: Classify,
{
    move |args: A| {
        let mut retrier = make_retrier();
        retrier.run_with(&mut operation, args)
    }
}

/// Wrap an async `operation` so every call is retried by a retrier from
/// `make_retrier`.
///
/// # Examples
///
/// ```rust
/// use persevere::backoff::ConstantBackoff;
/// use persevere::{retrying_async, AsyncRetrier};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let double = retrying_async(
///     || {
///         AsyncRetrier::builder()
///             .backoff(ConstantBackoff::new(Duration::ZERO, 3))
///             .build()
///     },
///     |n: u64| async move { Ok::<_, String>(n * 2) },
/// );
///
/// assert_eq!(double(21).await, Ok(42));
/// # });
/// ```
#[cfg(feature = "async")]
pub fn retrying_async<T, E, A, M, F, Fut>(
    make_retrier: M,
    operation: F,
) -> impl Fn(A) -> BoxFuture<'static, Result<T, RetryError<E>>> + Send + Sync
where
    M: Fn() -> AsyncRetrier<T, E> + Send + Sync + 'static,
    F: Fn(A) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    A: Clone + Send + Sync + 'static,
    T: Send + 'static,
    E: Classify + Send + Sync + 'static,
{
    move |args: A| {
        let mut retrier = make_retrier();
        let operation = operation.clone();
        async move { retrier.run_with(operation, args).await }.boxed()
    }
}
