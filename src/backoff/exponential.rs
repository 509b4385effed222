//! Exponential backoff with randomized jitter.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use super::{Backoff, STOP};
use crate::clock::{self, Clock};
use crate::error::ConfigError;

/// Backoff whose delays grow geometrically, randomized around the current
/// interval.
///
/// Each call to [`next`](Backoff::next) returns a random delay in
///
/// ```text
/// [current - factor * current, current + factor * current]
/// ```
///
/// and then multiplies `current` by `multiplier`, clamping it to
/// `max_interval`. The clamp applies to the interval, not to the randomized
/// delay.
///
/// Once more than `max_elapsed` has passed since the first `next` call the
/// strategy returns [`STOP`] until it is reset. A `max_elapsed` of zero
/// disables that limit.
///
/// With the defaults (`interval = 500ms`, `factor = 0.5`,
/// `multiplier = 1.5`) the sequence looks like:
///
/// ```text
/// call  interval   randomized range
/// 1     0.5s       [0.25s, 0.75s]
/// 2     0.75s      [0.375s, 1.125s]
/// 3     1.125s     [0.562s, 1.687s]
/// 4     1.687s     [0.843s, 2.53s]
/// ```
///
/// # Examples
///
/// ```rust
/// use persevere::backoff::{Backoff, ExponentialBackoff};
/// use std::time::Duration;
///
/// let mut backoff = ExponentialBackoff::builder()
///     .interval(Duration::from_millis(100))
///     .factor(0.0)
///     .multiplier(2.0)
///     .max_interval(Duration::from_millis(300))
///     .build()
///     .unwrap();
///
/// assert_eq!(backoff.next(), Some(Duration::from_millis(100)));
/// assert_eq!(backoff.next(), Some(Duration::from_millis(200)));
/// assert_eq!(backoff.next(), Some(Duration::from_millis(300)));
/// assert_eq!(backoff.next(), Some(Duration::from_millis(300)));
/// ```
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    interval: Duration,
    factor: f64,
    multiplier: f64,
    max_interval: Duration,
    max_elapsed: Duration,
    current_interval: Duration,
    started: Option<Duration>,
    clock: Arc<dyn Clock>,
}

/// Builder for [`ExponentialBackoff`].
///
/// Parameters are validated by [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ExponentialBackoffBuilder {
    interval: Duration,
    factor: f64,
    multiplier: f64,
    max_interval: Duration,
    max_elapsed: Duration,
    clock: Option<Arc<dyn Clock>>,
}

impl ExponentialBackoff {
    /// Default starting interval.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);
    /// Default randomization factor.
    pub const DEFAULT_FACTOR: f64 = 0.5;
    /// Default growth multiplier.
    pub const DEFAULT_MULTIPLIER: f64 = 1.5;
    /// Default interval cap.
    pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(6);
    /// Default elapsed-time budget.
    pub const DEFAULT_MAX_ELAPSED: Duration = Duration::from_secs(15 * 60);

    /// Start configuring an exponential backoff.
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder {
            interval: Self::DEFAULT_INTERVAL,
            factor: Self::DEFAULT_FACTOR,
            multiplier: Self::DEFAULT_MULTIPLIER,
            max_interval: Self::DEFAULT_MAX_INTERVAL,
            max_elapsed: Self::DEFAULT_MAX_ELAPSED,
            clock: None,
        }
    }

    /// The starting interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The randomization factor, within `[0, 1]`.
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// The growth multiplier.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// The interval cap.
    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    /// The elapsed-time budget; zero means unlimited.
    pub fn max_elapsed(&self) -> Duration {
        self.max_elapsed
    }

    /// The interval the next delay will be randomized around.
    pub fn current_interval(&self) -> Duration {
        self.current_interval
    }

    /// Time since the first `next` call after construction or reset.
    ///
    /// Zero before the first call.
    pub fn elapsed(&self) -> Duration {
        self.started
            .map(|started| self.clock.since(started))
            .unwrap_or_default()
    }

    fn randomized_interval(&self) -> Duration {
        let current = self.current_interval.as_secs_f64();
        let delta = self.factor * current;
        let low = current - delta;
        let high = current + delta;
        let rand: f64 = rand::rng().random();
        let secs = (low + rand * (high - low)).max(0.0);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    fn increment_interval(&mut self) {
        let current = self.current_interval.as_secs_f64();
        let max = self.max_interval.as_secs_f64();
        let grown = current * self.multiplier;
        // also catches overflow to infinity
        self.current_interval = if grown >= max {
            self.max_interval
        } else {
            Duration::try_from_secs_f64(grown).unwrap_or(self.max_interval)
        };
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            factor: Self::DEFAULT_FACTOR,
            multiplier: Self::DEFAULT_MULTIPLIER,
            max_interval: Self::DEFAULT_MAX_INTERVAL,
            max_elapsed: Self::DEFAULT_MAX_ELAPSED,
            current_interval: Self::DEFAULT_INTERVAL,
            started: None,
            clock: clock::system(),
        }
    }
}

impl Backoff for ExponentialBackoff {
    fn reset(&mut self) {
        self.started = None;
        self.current_interval = self.interval;
    }

    fn next(&mut self) -> Option<Duration> {
        if self.started.is_none() {
            self.started = Some(self.clock.now());
        }

        if !self.max_elapsed.is_zero() && self.elapsed() > self.max_elapsed {
            return STOP;
        }

        let delay = self.randomized_interval();
        self.increment_interval();
        Some(delay)
    }
}

impl ExponentialBackoffBuilder {
    /// Starting interval.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Randomization factor. Clamped to `[0, 1]`.
    pub fn factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    /// Growth multiplier applied to the interval after each call.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Cap on the (non-randomized) interval.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }

    /// Elapsed-time budget. Zero disables it.
    pub fn max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    /// Clock used to measure the elapsed-time budget.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate the parameters and build the backoff.
    ///
    /// Fails when `multiplier` is negative or not finite, or when `factor` is
    /// not finite.
    pub fn build(self) -> Result<ExponentialBackoff, ConfigError> {
        let multiplier = ConfigError::check_non_negative("multiplier", self.multiplier)?;
        if !self.factor.is_finite() {
            return Err(ConfigError::not_finite("factor", self.factor));
        }

        Ok(ExponentialBackoff {
            interval: self.interval,
            factor: self.factor.clamp(0.0, 1.0),
            multiplier,
            max_interval: self.max_interval,
            max_elapsed: self.max_elapsed,
            current_interval: self.interval,
            started: None,
            clock: self.clock.unwrap_or_else(clock::system),
        })
    }
}
