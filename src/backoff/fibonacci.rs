//! Fibonacci backoff.

use std::time::Duration;

use super::{take_budget, Backoff, STOP};

/// Backoff whose delays follow the Fibonacci sequence.
///
/// The sequence is seeded with `initial` and each value is scaled by
/// `multiplier`. With the default seed of `1` the delays are
/// `1, 2, 3, 5, 8, 13, ...` times the multiplier.
///
/// # Examples
///
/// ```rust
/// use persevere::backoff::{Backoff, FibonacciBackoff};
/// use std::time::Duration;
///
/// let mut backoff = FibonacciBackoff::new(Duration::from_millis(100), 4);
///
/// assert_eq!(backoff.next(), Some(Duration::from_millis(100)));
/// assert_eq!(backoff.next(), Some(Duration::from_millis(200)));
/// assert_eq!(backoff.next(), Some(Duration::from_millis(300)));
/// assert_eq!(backoff.next(), Some(Duration::from_millis(500)));
/// assert_eq!(backoff.next(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FibonacciBackoff {
    initial: u64,
    multiplier: Duration,
    retries: u32,
    used: u32,
    prev: u64,
    current: u64,
}

impl FibonacciBackoff {
    /// Default retry budget.
    pub const DEFAULT_RETRIES: u32 = 10;
    /// Default scale applied to each sequence number.
    pub const DEFAULT_MULTIPLIER: Duration = Duration::from_millis(1);

    /// Create a Fibonacci backoff seeded at `1`. A `retries` of `0` never stops.
    pub fn new(multiplier: Duration, retries: u32) -> Self {
        Self::with_initial(1, multiplier, retries)
    }

    /// Create a Fibonacci backoff with a custom seed. A seed of `0` is treated as `1`.
    pub fn with_initial(initial: u64, multiplier: Duration, retries: u32) -> Self {
        let initial = initial.max(1);
        Self {
            initial,
            multiplier,
            retries,
            used: 0,
            prev: 0,
            current: initial,
        }
    }

    /// The sequence seed.
    pub fn initial(&self) -> u64 {
        self.initial
    }

    /// The scale applied to each sequence number.
    pub fn multiplier(&self) -> Duration {
        self.multiplier
    }

    /// The configured retry budget.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Delays handed out since the last reset.
    pub fn used(&self) -> u32 {
        self.used
    }

    fn advance(&mut self) -> u64 {
        let next = self.prev.saturating_add(self.current);
        self.prev = self.current;
        self.current = next;
        next
    }
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MULTIPLIER, Self::DEFAULT_RETRIES)
    }
}

impl Backoff for FibonacciBackoff {
    fn reset(&mut self) {
        self.used = 0;
        self.prev = 0;
        self.current = self.initial;
    }

    fn next(&mut self) -> Option<Duration> {
        if !take_budget(&mut self.used, self.retries) {
            return STOP;
        }
        let n = self.advance();
        Some(scale(self.multiplier, n))
    }
}

fn scale(unit: Duration, n: u64) -> Duration {
    let nanos = unit.as_nanos().saturating_mul(u128::from(n));
    let secs = u64::try_from(nanos / 1_000_000_000).unwrap_or(u64::MAX);
    // remainder always fits in u32
    Duration::new(secs, (nanos % 1_000_000_000) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let backoff = FibonacciBackoff::default();
        assert_eq!(backoff.initial(), 1);
        assert_eq!(backoff.retries(), 10);
        assert_eq!(backoff.multiplier(), Duration::from_millis(1));
        assert_eq!(backoff.used(), 0);
    }

    #[test]
    fn test_sequence() {
        let mut backoff = FibonacciBackoff::default();

        for (i, n) in [1u64, 2, 3, 5, 8, 13, 21].into_iter().enumerate() {
            assert_eq!(backoff.next(), Some(Duration::from_millis(n)));
            assert_eq!(backoff.used(), i as u32 + 1);
        }

        backoff.reset();
        assert_eq!(backoff.used(), 0);
        assert_eq!(backoff.next(), Some(Duration::from_millis(1)));
    }

    #[test]
    fn test_custom_seed_and_multiplier() {
        let mut backoff = FibonacciBackoff::with_initial(2, Duration::from_millis(2), 5);

        let delays: Vec<_> = std::iter::from_fn(|| backoff.next()).collect();
        assert_eq!(
            delays,
            [2u64, 4, 6, 10, 16]
                .into_iter()
                .map(|n| Duration::from_millis(n * 2))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_zero_seed_is_one() {
        let backoff = FibonacciBackoff::with_initial(0, Duration::from_millis(1), 1);
        assert_eq!(backoff.initial(), 1);
    }

    #[test]
    fn test_max_retries() {
        let mut backoff = FibonacciBackoff::new(Duration::from_millis(1), 5);
        for _ in 0..5 {
            assert!(backoff.next().is_some());
        }
        assert_eq!(backoff.next(), STOP);
    }

    #[test]
    fn test_unlimited_saturates() {
        let mut backoff = FibonacciBackoff::new(Duration::from_secs(1), 0);
        let mut last = Duration::ZERO;
        for _ in 0..200 {
            let delay = backoff.next().unwrap();
            assert!(delay >= last);
            last = delay;
        }
    }
}
