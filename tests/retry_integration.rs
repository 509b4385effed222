//! Integration tests for retrying realistic fallible operations.

use persevere::backoff::{ConstantBackoff, ExponentialBackoff};
use persevere::classify::{add_whitelist_error, Categorized, Classify, ErrorCategory, NotRetriable};
use persevere::testing::{ManualClock, RecordingSleep};
use persevere::{retrying, Retrier, RetryError};
use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// A flaky service with a typed error
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum ServiceError {
    Unavailable,
    RateLimited { retry_after: Duration },
    InvalidRequest(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Unavailable => write!(f, "service unavailable"),
            ServiceError::RateLimited { retry_after } => {
                write!(f, "rate limited, retry after {:?}", retry_after)
            }
            ServiceError::InvalidRequest(reason) => write!(f, "invalid request: {}", reason),
        }
    }
}

impl Error for ServiceError {}

impl Classify for ServiceError {
    fn category(&self) -> ErrorCategory {
        match self {
            ServiceError::Unavailable | ServiceError::RateLimited { .. } => {
                ErrorCategory::new("service.transient").unwrap()
            }
            ServiceError::InvalidRequest(_) => ErrorCategory::SYNTAX,
        }
    }
}

struct FlakyService {
    script: VecDeque<Result<String, ServiceError>>,
    calls: usize,
}

impl FlakyService {
    fn new(script: Vec<Result<String, ServiceError>>) -> Self {
        Self {
            script: script.into(),
            calls: 0,
        }
    }

    fn call(&mut self) -> Result<String, ServiceError> {
        self.calls += 1;
        self.script
            .pop_front()
            .unwrap_or(Err(ServiceError::Unavailable))
    }
}

#[test]
fn recovers_from_transient_service_errors() {
    let mut service = FlakyService::new(vec![
        Err(ServiceError::Unavailable),
        Err(ServiceError::RateLimited {
            retry_after: Duration::from_millis(5),
        }),
        Ok("payload".to_string()),
    ]);
    let sleep = RecordingSleep::new();
    let mut retrier = Retrier::builder()
        .backoff(ConstantBackoff::new(Duration::from_millis(10), 5))
        .sleep(sleep.sleeper())
        .build();

    let result = retrier.run(|| service.call());

    assert_eq!(result, Ok("payload".to_string()));
    assert_eq!(service.calls, 3);
    assert_eq!(retrier.attempts(), 2);
    assert_eq!(sleep.delays(), vec![Duration::from_millis(10); 2]);
}

#[test]
fn invalid_request_is_not_retried() {
    let mut service = FlakyService::new(vec![
        Err(ServiceError::Unavailable),
        Err(ServiceError::InvalidRequest("missing id".to_string())),
    ]);
    let mut retrier = Retrier::builder()
        .backoff(ConstantBackoff::new(Duration::ZERO, 5))
        .build();

    let result = retrier.run(|| service.call());

    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "invalid request: missing id");
    assert_eq!(
        err.into_operation_error(),
        Some(ServiceError::InvalidRequest("missing id".to_string()))
    );
    assert_eq!(service.calls, 2);
}

#[test]
fn observer_can_honor_rate_limit_hints() {
    let hints = Arc::new(std::sync::Mutex::new(Vec::new()));
    let recorder = Arc::clone(&hints);
    let mut service = FlakyService::new(vec![
        Err(ServiceError::RateLimited {
            retry_after: Duration::from_secs(2),
        }),
        Ok("done".to_string()),
    ]);

    let mut retrier = Retrier::<String, ServiceError>::builder()
        .backoff(ConstantBackoff::new(Duration::ZERO, 3))
        .on_retry(move |err, _delay| {
            if let ServiceError::RateLimited { retry_after } = err {
                recorder.lock().unwrap().push(*retry_after);
            }
            Ok(())
        })
        .build();

    assert_eq!(retrier.run(|| service.call()), Ok("done".to_string()));
    assert_eq!(*hints.lock().unwrap(), vec![Duration::from_secs(2)]);
}

#[test]
fn exhaustion_chains_last_error_as_source() {
    let mut retrier = Retrier::<(), ServiceError>::builder()
        .backoff(ConstantBackoff::new(Duration::ZERO, 2))
        .build();

    let err = retrier.run(|| Err(ServiceError::Unavailable)).unwrap_err();

    assert!(err.is_max_retries());
    assert_eq!(
        err.to_string(),
        "max retries exceeded after 2 attempts: service unavailable"
    );
    assert_eq!(err.source().unwrap().to_string(), "service unavailable");
}

// ============================================================================
// Standard library and boxed errors
// ============================================================================

#[test]
fn interrupted_io_error_is_retried() {
    let mut retrier = Retrier::<u32, io::Error>::builder()
        .backoff(ConstantBackoff::new(Duration::ZERO, 5))
        .build();

    let mut calls = 0;
    let result = retrier.run(|| {
        calls += 1;
        if calls <= 2 {
            Err(io::Error::from(io::ErrorKind::Interrupted))
        } else {
            Ok(7)
        }
    });

    assert_eq!(result.ok(), Some(7));
    assert_eq!(calls, 3);
    assert_eq!(retrier.attempts(), 2);
}

#[test]
fn io_errors_exhaust_the_budget() {
    let mut retrier = Retrier::<(), io::Error>::builder()
        .backoff(ConstantBackoff::new(Duration::ZERO, 3))
        .build();

    let result = retrier.run(|| Err(io::Error::from(io::ErrorKind::TimedOut)));
    assert!(result.unwrap_err().is_max_retries());
    assert_eq!(retrier.attempts(), 3);
}

#[test]
fn boxed_errors_are_classified_by_downcast() {
    let mut retrier = Retrier::<(), Box<dyn Error + Send + Sync>>::builder()
        .backoff(ConstantBackoff::new(Duration::ZERO, 3))
        .build();

    let mut calls = 0;
    let result = retrier.run(|| {
        calls += 1;
        if calls == 1 {
            Err("plain string error".into())
        } else {
            Err(Box::new(NotRetriable::new("stop here")))
        }
    });

    assert_eq!(result.unwrap_err().to_string(), "stop here");
    assert_eq!(calls, 2);
}

#[test]
fn registered_categories_apply_to_new_retriers() {
    let category = ErrorCategory::new("integration.billing").unwrap();
    let error = || Categorized::new("card declined", category.clone());

    let mut before = Retrier::<(), _>::builder()
        .backoff(ConstantBackoff::new(Duration::ZERO, 1))
        .build();
    add_whitelist_error([category.clone()]).unwrap();
    let mut after = Retrier::<(), _>::builder()
        .backoff(ConstantBackoff::new(Duration::ZERO, 1))
        .build();

    assert!(before.run(|| Err(error())).unwrap_err().is_max_retries());
    assert!(after.run(|| Err(error())).unwrap_err().is_operation());
}

// ============================================================================
// Timing
// ============================================================================

#[test]
fn exponential_backoff_under_manual_clock() {
    let clock = ManualClock::new();
    let sleep = RecordingSleep::advancing(clock.clone());
    let backoff = ExponentialBackoff::builder()
        .interval(Duration::from_millis(100))
        .factor(0.0)
        .multiplier(2.0)
        .max_interval(Duration::from_millis(500))
        .max_elapsed(Duration::from_secs(2))
        .clock(Arc::new(clock.clone()))
        .build()
        .unwrap();

    let mut retrier = Retrier::<(), &str>::builder()
        .backoff(backoff)
        .sleep(sleep.sleeper())
        .build();

    let result = retrier.run(|| Err("down"));

    assert!(matches!(result, Err(RetryError::MaxRetriesExceeded { .. })));
    let delays: Vec<u64> = sleep
        .delays()
        .iter()
        .map(|d| d.as_millis() as u64)
        .collect();
    assert_eq!(delays, vec![100, 200, 400, 500, 500, 500]);
}

#[test]
fn wrapped_function_retries_each_call() {
    let mut remaining_failures = 1;
    let mut parse = retrying(
        || {
            Retrier::builder()
                .backoff(ConstantBackoff::new(Duration::ZERO, 2))
                .build()
        },
        move |input: &'static str| {
            if remaining_failures > 0 {
                remaining_failures -= 1;
                return Err(NotRetriable::new("warming up").retrying());
            }
            input.parse::<u32>().map_err(|e| NotRetriable::new(e.to_string()))
        },
    );

    assert_eq!(parse("17"), Ok(17));
    assert!(parse("x").unwrap_err().is_operation());
}
