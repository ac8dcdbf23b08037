//! Sliding-window rate limiting for outbound inference calls
//!
//! One window of call timestamps covering the trailing hour. Two policies:
//! blocking (sleep until the oldest call exits the window) and graceful
//! (surface [`Error::RateLimited`] so the caller can fall back to cache).

use crate::error::{Error, Result};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Utilization fraction that triggers a warning log
const UTILIZATION_WARN_THRESHOLD: f64 = 0.8;

/// Point-in-time rate limit status
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    /// Calls currently inside the window
    pub current: u32,
    /// Configured limit
    pub limit: u32,
    /// current / limit (0.0 – 1.0)
    pub utilization: f64,
    /// Milliseconds until the oldest call exits the window (0 when under limit)
    pub retry_after_ms: u64,
}

/// Sliding one-hour window rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    timestamps: Mutex<Vec<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing `limit` calls per trailing hour
    #[must_use]
    pub fn hourly(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(3600))
    }

    /// Create a limiter with an explicit window (used by tests)
    #[must_use]
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            timestamps: Mutex::new(Vec::new()),
        }
    }

    /// Current status, after pruning expired timestamps
    #[must_use]
    pub fn status(&self) -> RateLimitStatus {
        let mut timestamps = self.lock();
        self.prune(&mut timestamps);
        self.status_locked(&timestamps)
    }

    /// Admit one call, recording its timestamp once allowed
    ///
    /// With `graceful` set, a full window returns [`Error::RateLimited`]
    /// immediately; otherwise the call sleeps until capacity frees up.
    /// Cached responses must not pass through here - budget is only consumed
    /// by live calls.
    pub async fn acquire(&self, graceful: bool) -> Result<()> {
        loop {
            let wait = {
                let mut timestamps = self.lock();
                self.prune(&mut timestamps);
                let status = self.status_locked(&timestamps);

                if status.current < self.limit {
                    if status.utilization >= UTILIZATION_WARN_THRESHOLD {
                        warn!(
                            current = status.current,
                            limit = status.limit,
                            utilization = %format!("{:.0}%", status.utilization * 100.0),
                            "Rate limit utilization high"
                        );
                    }
                    timestamps.push(Instant::now());
                    return Ok(());
                }

                if graceful {
                    return Err(Error::RateLimited {
                        retry_after_ms: status.retry_after_ms,
                        current: status.current,
                        limit: status.limit,
                    });
                }

                Duration::from_millis(status.retry_after_ms.max(1))
            };

            debug!(wait_ms = wait.as_millis() as u64, "Rate limited, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Drop all recorded timestamps
    pub fn reset(&self) {
        self.lock().clear();
    }

    fn prune(&self, timestamps: &mut Vec<Instant>) {
        timestamps.retain(|t| t.elapsed() < self.window);
    }

    fn status_locked(&self, timestamps: &[Instant]) -> RateLimitStatus {
        let current = timestamps.len() as u32;
        let retry_after_ms = if current >= self.limit {
            timestamps
                .iter()
                .min()
                .map(|oldest| {
                    self.window
                        .saturating_sub(oldest.elapsed())
                        .as_millis() as u64
                })
                .unwrap_or(0)
                .max(1)
        } else {
            0
        };

        RateLimitStatus {
            current,
            limit: self.limit,
            utilization: f64::from(current) / f64::from(self.limit.max(1)),
            retry_after_ms,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Instant>> {
        self.timestamps.lock().unwrap_or_else(|e| e.into_inner())
    }
}
