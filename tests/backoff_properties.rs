//! Property-based tests for backoff strategies and error classification

use persevere::backoff::{Backoff, ConstantBackoff, ExponentialBackoff, FibonacciBackoff, STOP};
use persevere::classify::{Categorized, ErrorBlacklist, ErrorCategory, ErrorWhitelist};
use persevere::testing::ManualClock;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn category_name() -> impl Strategy<Value = String> {
    "[a-z]{1,8}(\\.[a-z]{1,8})?"
}

proptest! {
    #[test]
    fn prop_constant_yields_interval_then_stops(interval_ms in 0u64..10_000, retries in 1u32..50) {
        let interval = Duration::from_millis(interval_ms);
        let mut backoff = ConstantBackoff::new(interval, retries);

        for _ in 0..retries {
            prop_assert_eq!(backoff.next(), Some(interval));
        }
        prop_assert_eq!(backoff.next(), STOP);

        backoff.reset();
        prop_assert_eq!(backoff.next(), Some(interval));
    }

    #[test]
    fn prop_fibonacci_follows_recurrence(
        initial in 1u64..100,
        unit_ms in 1u64..100,
        retries in 3u32..30,
    ) {
        let unit = Duration::from_millis(unit_ms);
        let mut backoff = FibonacciBackoff::with_initial(initial, unit, retries);

        let delays: Vec<Duration> = (0..retries).map_while(|_| backoff.next()).collect();
        prop_assert_eq!(delays.len(), retries as usize);
        prop_assert_eq!(backoff.next(), STOP);

        prop_assert_eq!(delays[0], unit * initial as u32);
        for window in delays.windows(3) {
            prop_assert_eq!(window[2], window[0] + window[1]);
        }
    }

    #[test]
    fn prop_exponential_delay_within_randomization_bounds(
        interval_ms in 1u64..1_000,
        factor in 0.0f64..=1.0,
        multiplier in 1.1f64..3.0,
        steps in 1usize..20,
    ) {
        let mut backoff = ExponentialBackoff::builder()
            .interval(Duration::from_millis(interval_ms))
            .factor(factor)
            .multiplier(multiplier)
            .max_interval(Duration::from_secs(60))
            .max_elapsed(Duration::ZERO)
            .build()
            .unwrap();

        let mut previous = Duration::ZERO;
        for _ in 0..steps {
            let current = backoff.current_interval().as_secs_f64();
            prop_assert!(backoff.current_interval() >= previous);
            previous = backoff.current_interval();

            let delay = backoff.next().unwrap().as_secs_f64();
            let slack = 1e-6;
            prop_assert!(delay >= current - factor * current - slack);
            prop_assert!(delay <= current + factor * current + slack);
        }
        prop_assert!(backoff.current_interval() <= Duration::from_secs(60));
    }

    #[test]
    fn prop_exponential_stops_after_max_elapsed(
        budget_ms in 1u64..10_000,
        overshoot_ms in 1u64..10_000,
    ) {
        let clock = ManualClock::new();
        let mut backoff = ExponentialBackoff::builder()
            .max_elapsed(Duration::from_millis(budget_ms))
            .clock(Arc::new(clock.clone()))
            .build()
            .unwrap();

        prop_assert!(backoff.next().is_some());
        clock.advance(Duration::from_millis(budget_ms + overshoot_ms));
        for _ in 0..3 {
            prop_assert_eq!(backoff.next(), STOP);
        }
    }

    #[test]
    fn prop_blacklist_negates_whitelist_without_force_flag(
        listed in prop::collection::vec(category_name(), 0..6),
        sample in category_name(),
    ) {
        let whitelist = ErrorWhitelist::with_errors(listed.clone()).unwrap();
        let blacklist = ErrorBlacklist::with_errors(listed).unwrap();
        let error = Categorized::new("sample", ErrorCategory::new(sample).unwrap());

        prop_assert_eq!(blacklist.is_retryable(&error), !whitelist.is_retryable(&error));
    }

    #[test]
    fn prop_force_flag_makes_whitelisted_error_retryable(name in category_name()) {
        let whitelist = ErrorWhitelist::with_errors([name.clone()]).unwrap();
        let error = Categorized::new("sample", ErrorCategory::new(name).unwrap());

        prop_assert!(!whitelist.is_retryable(&error));
        prop_assert!(whitelist.is_retryable(&error.retrying()));
    }
}
