//! Retry and circuit-breaker behavior under a paused clock.

use flowdeck::resilience::{CircuitBreaker, CircuitError, CircuitState, RetryPolicy};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn quick_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(100),
        backoff_multiplier: 2.0,
    }
}

#[tokio::test(start_paused = true)]
async fn retry_succeeds_after_transient_failures() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let result = quick_policy(3)
        .run(
            |_: &String| true,
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if attempt < 3 {
                        Err(format!("transient failure {attempt}"))
                    } else {
                        Ok("recovered")
                    }
                }
            },
        )
        .await;

    assert_eq!(result.unwrap(), "recovered");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn retry_exhaustion_reports_attempts_and_last_error() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let result: Result<(), _> = quick_policy(3)
        .run(
            |_: &String| true,
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    Err(format!("failure {attempt}"))
                }
            },
        )
        .await;

    let exhausted = result.unwrap_err();
    assert_eq!(exhausted.attempts, 3);
    assert_eq!(exhausted.last_error, "failure 3");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(exhausted.to_string().contains("after 3 attempt"));
}

#[tokio::test(start_paused = true)]
async fn non_retryable_errors_stop_immediately() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let result: Result<(), _> = quick_policy(5)
        .run(
            |_: &String| false,
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err("malformed input".to_string())
                }
            },
        )
        .await;

    assert_eq!(result.unwrap_err().attempts, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

async fn fail(breaker: &CircuitBreaker) {
    let result: Result<(), _> = breaker
        .execute(|| async { Err::<(), _>("backend down".to_string()) })
        .await;
    assert!(matches!(result, Err(CircuitError::Inner(_))));
}

#[tokio::test(start_paused = true)]
async fn breaker_opens_at_threshold_and_rejects_without_invoking() {
    let breaker = CircuitBreaker::new(2, Duration::from_secs(30));
    assert_eq!(breaker.state(), CircuitState::Closed);

    fail(&breaker).await;
    assert_eq!(breaker.state(), CircuitState::Closed);
    fail(&breaker).await;
    assert_eq!(breaker.state(), CircuitState::Open);

    // Before the reset timeout the wrapped operation must not run at all.
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let result: Result<(), _> = breaker
        .execute(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), String>(())
            }
        })
        .await;

    assert!(matches!(result, Err(CircuitError::Open)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn breaker_closes_after_successful_half_open_trial() {
    let breaker = CircuitBreaker::new(2, Duration::from_secs(30));
    fail(&breaker).await;
    fail(&breaker).await;
    assert_eq!(breaker.state(), CircuitState::Open);

    tokio::time::advance(Duration::from_secs(31)).await;

    let result: Result<&str, CircuitError<String>> =
        breaker.execute(|| async { Ok("recovered") }).await;
    assert_eq!(result.unwrap(), "recovered");
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.failures(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_half_open_trial_reopens_and_restarts_the_timer() {
    let breaker = CircuitBreaker::new(2, Duration::from_secs(30));
    fail(&breaker).await;
    fail(&breaker).await;

    tokio::time::advance(Duration::from_secs(31)).await;
    fail(&breaker).await;
    assert_eq!(breaker.state(), CircuitState::Open);

    // Timer restarted: still rejecting shortly after the failed trial.
    tokio::time::advance(Duration::from_secs(10)).await;
    let result: Result<(), _> = breaker
        .execute(|| async { Ok::<(), String>(()) })
        .await;
    assert!(matches!(result, Err(CircuitError::Open)));
}
