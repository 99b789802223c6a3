/// Bounded retry with exponential backoff
///
/// Wraps an async operation and re-invokes it until it succeeds, the retry
/// predicate rejects the error, or the attempt budget is exhausted. The
/// delay between attempts grows geometrically and is capped.

use std::fmt::{Debug, Display};
use std::time::Duration;
use thiserror::Error;

/// Raised when an operation kept failing: carries the attempt count and the
/// last underlying error.
#[derive(Debug, Error)]
#[error("operation failed after {attempts} attempt(s): {last_error}")]
pub struct RetryExhausted<E: Display + Debug> {
    pub attempts: u32,
    pub last_error: E,
}

/// Retry parameters. `max_attempts` counts the first invocation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Run `operation` under this policy. `should_retry` classifies errors;
    /// a rejected error stops immediately but is still wrapped with its
    /// attempt count so callers see one failure shape.
    pub async fn run<T, E, F, Fut, P>(
        &self,
        should_retry: P,
        mut operation: F,
    ) -> Result<T, RetryExhausted<E>>
    where
        E: Display + Debug,
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut delay = self.base_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= max_attempts || !should_retry(&err) {
                        return Err(RetryExhausted {
                            attempts: attempt,
                            last_error: err,
                        });
                    }

                    tracing::debug!(
                        "🔁 Attempt {attempt}/{max_attempts} failed, retrying in {delay:?}: {err}"
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay.mul_f64(self.backoff_multiplier), self.max_delay);
                }
            }
        }
    }
}
