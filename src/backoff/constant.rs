//! Constant backoff.

use std::time::Duration;

use super::{Backoff, STOP};

/// Backoff that waits the same interval before every retry.
///
/// `retries` bounds the number of delays handed out; `0` means unlimited.
///
/// # Examples
///
/// ```rust
/// use persevere::backoff::{Backoff, ConstantBackoff};
/// use std::time::Duration;
///
/// let mut backoff = ConstantBackoff::new(Duration::from_millis(500), 3);
///
/// // Every retry waits 500ms
/// assert_eq!(backoff.next(), Some(Duration::from_millis(500)));
/// assert_eq!(backoff.next(), Some(Duration::from_millis(500)));
/// assert_eq!(backoff.next(), Some(Duration::from_millis(500)));
/// assert_eq!(backoff.next(), None); // budget spent
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantBackoff {
    interval: Duration,
    retries: u32,
    pending_retries: u32,
}

impl ConstantBackoff {
    /// Default wait between attempts.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);
    /// Default retry budget.
    pub const DEFAULT_RETRIES: u32 = 10;

    /// Create a constant backoff. A `retries` of `0` never stops.
    pub fn new(interval: Duration, retries: u32) -> Self {
        Self {
            interval,
            retries,
            pending_retries: retries,
        }
    }

    /// Constant backoff with no retry limit.
    pub fn unlimited(interval: Duration) -> Self {
        Self::new(interval, 0)
    }

    /// The configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The configured retry budget.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Retries left before the strategy stops.
    pub fn pending_retries(&self) -> u32 {
        self.pending_retries
    }
}

impl Default for ConstantBackoff {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL, Self::DEFAULT_RETRIES)
    }
}

impl Backoff for ConstantBackoff {
    fn reset(&mut self) {
        self.pending_retries = self.retries;
    }

    fn next(&mut self) -> Option<Duration> {
        if self.retries > 0 {
            if self.pending_retries == 0 {
                return STOP;
            }
            self.pending_retries -= 1;
        }
        Some(self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let backoff = ConstantBackoff::default();
        assert_eq!(backoff.interval(), Duration::from_millis(100));
        assert_eq!(backoff.retries(), 10);
        assert_eq!(backoff.pending_retries(), 10);
    }

    #[test]
    fn test_exhausts_after_retries() {
        let mut backoff = ConstantBackoff::new(Duration::from_millis(100), 3);

        for remaining in (0..3).rev() {
            assert_eq!(backoff.next(), Some(Duration::from_millis(100)));
            assert_eq!(backoff.pending_retries(), remaining);
        }
        assert_eq!(backoff.next(), STOP);
        assert_eq!(backoff.next(), STOP);
    }

    #[test]
    fn test_reset_restores_budget() {
        let mut backoff = ConstantBackoff::new(Duration::ZERO, 1);
        assert_eq!(backoff.next(), Some(Duration::ZERO));
        assert_eq!(backoff.next(), STOP);

        backoff.reset();
        assert_eq!(backoff.pending_retries(), 1);
        assert_eq!(backoff.next(), Some(Duration::ZERO));
    }

    #[test]
    fn test_zero_retries_is_unlimited() {
        let mut backoff = ConstantBackoff::unlimited(Duration::from_millis(7));
        for _ in 0..500 {
            assert_eq!(backoff.next(), Some(Duration::from_millis(7)));
        }
    }
}
