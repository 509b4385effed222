//! Monotonic time sources.
//!
//! The retry engine measures its timeout, and [`ExponentialBackoff`] its
//! elapsed budget, against a [`Clock`]. Production code uses
//! [`MonotonicClock`]; tests swap in [`ManualClock`](crate::testing::ManualClock)
//! so timing-dependent behavior can be driven without real sleeps.
//!
//! [`ExponentialBackoff`]: crate::backoff::ExponentialBackoff

use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

/// A monotonic time source.
///
/// `now` returns the time elapsed since an arbitrary, fixed origin. Only
/// differences between two readings are meaningful.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current reading of the clock.
    fn now(&self) -> Duration;

    /// Time elapsed since an earlier reading of this clock.
    fn since(&self, earlier: Duration) -> Duration {
        self.now().saturating_sub(earlier)
    }
}

static ORIGIN: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Clock backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        ORIGIN.elapsed()
    }
}

/// The clock used when none is configured.
pub(crate) fn system() -> Arc<dyn Clock> {
    Arc::new(MonotonicClock)
}
