//! Backoff strategies producing the delays between retry attempts.
//!
//! A [`Backoff`] is a small state machine: every call to [`Backoff::next`]
//! yields the delay to wait before the next attempt, or [`STOP`] once the
//! strategy's budget is spent. [`Backoff::reset`] rewinds it to its initial
//! state; the retry engine calls it at the start of every run so a strategy
//! can be reused across runs.
//!
//! # Strategies
//!
//! - [`ConstantBackoff`]: the same delay every time
//! - [`FibonacciBackoff`]: delays follow the Fibonacci sequence
//! - [`ExponentialBackoff`]: delays grow geometrically with random jitter and
//!   an overall elapsed-time budget
//!
//! ```rust
//! use persevere::backoff::{Backoff, ConstantBackoff, STOP};
//! use std::time::Duration;
//!
//! let mut backoff = ConstantBackoff::new(Duration::from_millis(50), 2);
//!
//! assert_eq!(backoff.next(), Some(Duration::from_millis(50)));
//! assert_eq!(backoff.next(), Some(Duration::from_millis(50)));
//! assert_eq!(backoff.next(), STOP);
//!
//! backoff.reset();
//! assert_eq!(backoff.next(), Some(Duration::from_millis(50)));
//! ```
//!
//! # Thread safety
//!
//! Strategies carry mutable state and take `&mut self`. A single instance
//! drives one retry sequence at a time; concurrent sequences each need their
//! own instance.

mod constant;
mod exponential;
mod fibonacci;

use std::fmt;
use std::time::Duration;

pub use constant::ConstantBackoff;
pub use exponential::{ExponentialBackoff, ExponentialBackoffBuilder};
pub use fibonacci::FibonacciBackoff;

/// Value returned by [`Backoff::next`] when no further attempt should be made.
pub const STOP: Option<Duration> = None;

/// A strategy producing successive inter-attempt delays.
pub trait Backoff: Send + fmt::Debug {
    /// Restore the strategy to its initial configured state.
    fn reset(&mut self);

    /// Delay before the next attempt, or [`STOP`] when the budget is spent.
    fn next(&mut self) -> Option<Duration>;
}

impl<B: Backoff + ?Sized> Backoff for Box<B> {
    fn reset(&mut self) {
        (**self).reset()
    }

    fn next(&mut self) -> Option<Duration> {
        (**self).next()
    }
}

/// Count down a retry budget where zero means unlimited.
///
/// Returns `false` once `used` has reached a non-zero `limit`; otherwise
/// consumes one unit and returns `true`.
pub(crate) fn take_budget(used: &mut u32, limit: u32) -> bool {
    if limit == 0 {
        return true;
    }
    if *used >= limit {
        return false;
    }
    *used += 1;
    true
}
