//! Bounded retry with exponential backoff
//!
//! Wraps one physical attempt at a time. Delays follow
//! `retry_delay * 2^(attempt-1)` exactly; classification of what is worth
//! retrying lives with the error type ([`crate::error::Error::is_transient`]).
//! The executor reports only the final failure outward so a single logical
//! call records at most one failure against the circuit breaker.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (first try included)
    pub max_attempts: u32,
    /// Delay before the first retry; doubles each attempt
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay before retrying after the given attempt (1-based)
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(multiplier)
    }
}

/// Outcome of an exhausted or aborted retry loop
#[derive(Debug)]
pub struct RetryError<E> {
    /// The last error encountered
    pub last_error: E,
    /// Total number of attempts made
    pub attempts: u32,
}

impl<E: std::fmt::Display> std::fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "operation failed after {} attempts: {}",
            self.attempts, self.last_error
        )
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for RetryError<E> {}

/// Execute an async operation with bounded exponential backoff
///
/// Transient errors (per `is_retryable`) are absorbed until the attempt
/// budget runs out; non-retryable errors abort immediately without
/// consuming remaining attempts.
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    config: &RetryConfig,
    mut operation: F,
    is_retryable: R,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(attempt = attempt, "Attempt succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                let should_retry = attempt < max_attempts && is_retryable(&e);
                if should_retry {
                    let delay = config.delay_for(attempt);
                    warn!(
                        attempt = attempt,
                        max_attempts = max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Attempt failed, retrying"
                    );
                    sleep(delay).await;
                } else {
                    debug!(attempt = attempt, error = %e, "Attempt failed, no more retries");
                    return Err(RetryError {
                        last_error: e,
                        attempts: attempt,
                    });
                }
            }
        }
    }

    unreachable!("retry loop always returns from the error branch")
}
