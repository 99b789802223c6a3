/// Three-state circuit breaker for unstable external calls
///
/// Closed passes operations through and counts consecutive failures. Once
/// the threshold is reached the circuit opens and rejects calls immediately
/// without invoking the wrapped operation. After the reset timeout a single
/// half-open trial is admitted: success closes the circuit and clears the
/// counter, failure re-opens it and restarts the timer.

use std::fmt::{Debug, Display};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Failure of a call made through the breaker: either fast-rejected while
/// the circuit is open, or the wrapped operation's own error.
#[derive(Debug, Error)]
pub enum CircuitError<E: Display + Debug> {
    #[error("circuit breaker is open")]
    Open,
    #[error("{0}")]
    Inner(E),
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failures: u32,
    opened_at: Option<Instant>,
}

/// Failure-isolation wrapper guarding any unstable external call.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failures: 0,
                opened_at: None,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failures(&self) -> u32 {
        self.lock().failures
    }

    /// Run `operation` through the breaker. While open (and before the reset
    /// timeout) the operation is not invoked at all. Only one half-open
    /// trial runs at a time; concurrent callers are rejected until it
    /// settles.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, CircuitError<E>>
    where
        E: Display + Debug,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        {
            let mut inner = self.lock();
            match inner.state {
                CircuitState::Closed => {}
                CircuitState::HalfOpen => return Err(CircuitError::Open),
                CircuitState::Open => {
                    let settled = inner
                        .opened_at
                        .map(|at| at.elapsed() >= self.reset_timeout)
                        .unwrap_or(true);
                    if !settled {
                        return Err(CircuitError::Open);
                    }
                    inner.state = CircuitState::HalfOpen;
                    tracing::info!("🔎 Circuit breaker half-open, admitting trial call");
                }
            }
        }

        match operation().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                self.on_failure();
                Err(CircuitError::Inner(err))
            }
        }
    }

    fn on_success(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            tracing::info!("✅ Circuit breaker closed after successful trial");
        }
        inner.state = CircuitState::Closed;
        inner.failures = 0;
        inner.opened_at = None;
    }

    fn on_failure(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                tracing::warn!("⚠️ Half-open trial failed, circuit re-opened");
            }
            _ => {
                inner.failures += 1;
                if inner.failures >= self.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    tracing::warn!(
                        "⚠️ Circuit breaker opened after {} consecutive failures",
                        inner.failures
                    );
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
