//! Test doubles for deterministic retry tests.
//!
//! Real sleeps make retry tests slow and timeouts make them flaky. The types
//! here replace both: [`ManualClock`] is a [`Clock`] that only moves when told
//! to, and [`RecordingSleep`] is a sleep function that records every requested
//! delay and advances a `ManualClock` instead of blocking.
//!
//! # Example
//!
//! ```rust
//! use persevere::backoff::ConstantBackoff;
//! use persevere::testing::{ManualClock, RecordingSleep};
//! use persevere::{Retrier, RetryError};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let sleep = RecordingSleep::advancing(clock.clone());
//!
//! let mut retrier = Retrier::<(), &str>::builder()
//!     .backoff(ConstantBackoff::new(Duration::from_secs(1), 0))
//!     .timeout(Duration::from_millis(2500))
//!     .clock(Arc::new(clock.clone()))
//!     .sleep(sleep.sleeper())
//!     .build();
//!
//! let result = retrier.run(|| Err("down"));
//!
//! assert!(matches!(result, Err(RetryError::Timeout { .. })));
//! assert_eq!(sleep.delays(), vec![Duration::from_secs(1); 3]);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::clock::Clock;

/// A clock that only advances when [`advance`](Self::advance) is called.
///
/// Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.nanos
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_add(by))
            })
            .ok();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

/// A sleep function that records delays instead of blocking.
///
/// Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleep {
    delays: Arc<Mutex<Vec<Duration>>>,
    clock: Option<ManualClock>,
}

impl RecordingSleep {
    /// Record delays without touching any clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record delays and advance `clock` by each one.
    pub fn advancing(clock: ManualClock) -> Self {
        Self {
            delays: Arc::default(),
            clock: Some(clock),
        }
    }

    /// Record a single sleep.
    pub fn sleep(&self, delay: Duration) {
        self.delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(delay);
        if let Some(clock) = &self.clock {
            clock.advance(delay);
        }
    }

    /// Every delay recorded so far, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded sleeps.
    pub fn count(&self) -> usize {
        self.delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// A blocking sleep function for [`RetrierBuilder::sleep`](crate::RetrierBuilder::sleep).
    pub fn sleeper(&self) -> impl Fn(Duration) + Send + Sync + 'static {
        let this = self.clone();
        move |delay| this.sleep(delay)
    }

    /// An async sleep function for
    /// [`AsyncRetrierBuilder::sleep`](crate::AsyncRetrierBuilder::sleep).
    #[cfg(feature = "async")]
    pub fn async_sleeper(
        &self,
    ) -> impl Fn(Duration) -> futures::future::BoxFuture<'static, ()> + Send + Sync + 'static {
        use futures::FutureExt;

        let this = self.clone();
        move |delay| {
            this.sleep(delay);
            futures::future::ready(()).boxed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(Duration::from_millis(250));
        assert_eq!(other.now(), Duration::from_millis(250));
        assert_eq!(other.since(Duration::from_millis(50)), Duration::from_millis(200));
    }

    #[test]
    fn test_recording_sleep_advances_clock() {
        let clock = ManualClock::new();
        let sleep = RecordingSleep::advancing(clock.clone());
        let f = sleep.sleeper();

        f(Duration::from_millis(10));
        f(Duration::from_millis(20));

        assert_eq!(sleep.count(), 2);
        assert_eq!(
            sleep.delays(),
            vec![Duration::from_millis(10), Duration::from_millis(20)]
        );
        assert_eq!(clock.now(), Duration::from_millis(30));
    }

    #[test]
    fn test_recording_sleep_without_clock() {
        let sleep = RecordingSleep::new();
        sleep.sleep(Duration::from_secs(1));
        assert_eq!(sleep.delays(), vec![Duration::from_secs(1)]);
    }
}
