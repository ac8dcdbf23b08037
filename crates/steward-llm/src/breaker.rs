//! Circuit breaker guarding all outbound inference calls
//!
//! Three states:
//! - Closed: normal operation, requests pass through
//! - Open: consecutive failures exceeded the threshold, requests are rejected
//! - HalfOpen: probationary traffic tests whether the service recovered
//!
//! The Open → HalfOpen transition happens lazily inside [`CircuitBreaker::check`]
//! once the recovery timeout has elapsed, never on a background timer.

use crate::error::{Error, Result};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation - requests pass through
    Closed,
    /// Failures exceeded threshold - requests are rejected
    Open,
    /// Testing recovery - limited requests pass through
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open => write!(f, "Open"),
            Self::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

/// Configuration for the circuit breaker
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit
    pub consecutive_failure_threshold: u32,
    /// Successes in half-open state needed to close the circuit
    pub half_open_success_threshold: u32,
    /// Duration to wait before admitting probationary traffic
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            consecutive_failure_threshold: 3,
            half_open_success_threshold: 2,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the consecutive failure threshold
    #[must_use]
    pub fn with_consecutive_failure_threshold(mut self, threshold: u32) -> Self {
        self.consecutive_failure_threshold = threshold;
        self
    }

    /// Set the half-open success threshold
    #[must_use]
    pub fn with_half_open_success_threshold(mut self, threshold: u32) -> Self {
        self.half_open_success_threshold = threshold;
        self
    }

    /// Set the recovery timeout
    #[must_use]
    pub fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }
}

/// Point-in-time view of the breaker, for logs and operator decisions
#[derive(Debug, Clone)]
pub struct BreakerSnapshot {
    /// Current state
    pub state: CircuitState,
    /// Lifetime failure count
    pub failures: u64,
    /// Failures since the last closed-state success
    pub consecutive_failures: u32,
    /// Successes observed while half-open
    pub success_count: u32,
    /// Time since the last state change
    pub since_state_change: Duration,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failures: u64,
    consecutive_failures: u32,
    success_count: u32,
    last_failure_time: Option<Instant>,
    last_state_change: Instant,
}

/// Three-state failure-isolation gate
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failures: 0,
                consecutive_failures: 0,
                success_count: 0,
                last_failure_time: None,
                last_state_change: Instant::now(),
            }),
        }
    }

    /// Create with default configuration
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }

    /// Get the current state
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Get a point-in-time snapshot
    #[must_use]
    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            state: inner.state,
            failures: inner.failures,
            consecutive_failures: inner.consecutive_failures,
            success_count: inner.success_count,
            since_state_change: inner.last_state_change.elapsed(),
        }
    }

    /// How long the circuit has been open, or `None` when not open
    #[must_use]
    pub fn opened_for(&self) -> Option<Duration> {
        let inner = self.lock();
        match inner.state {
            CircuitState::Open => Some(inner.last_state_change.elapsed()),
            _ => None,
        }
    }

    /// Gate an outbound attempt
    ///
    /// Must be called before every attempt. While Open, returns
    /// [`Error::CircuitOpen`] until the recovery timeout has elapsed, at
    /// which point the circuit moves to HalfOpen and the attempt may proceed.
    pub fn check(&self) -> Result<()> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let since_failure = inner
                    .last_failure_time
                    .map(|t| t.elapsed())
                    .unwrap_or_default();

                if since_failure >= self.config.recovery_timeout {
                    info!("Circuit breaker entering half-open state");
                    inner.state = CircuitState::HalfOpen;
                    inner.success_count = 0;
                    inner.last_state_change = Instant::now();
                    Ok(())
                } else {
                    let remaining = self.config.recovery_timeout - since_failure;
                    Err(Error::CircuitOpen {
                        retry_after_secs: remaining.as_secs().max(1),
                        consecutive_failures: inner.consecutive_failures,
                    })
                }
            }
        }
    }

    /// Record a successful attempt
    pub fn record_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                debug!(
                    successes = inner.success_count,
                    threshold = self.config.half_open_success_threshold,
                    "Circuit breaker success in half-open state"
                );
                if inner.success_count >= self.config.half_open_success_threshold {
                    info!("Circuit breaker closed after successful probation");
                    inner.close();
                }
            }
            CircuitState::Open => {
                // A success cannot be observed while open; ignore.
            }
        }
    }

    /// Record a failed attempt
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.failures += 1;
        inner.last_failure_time = Some(Instant::now());

        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                debug!(
                    consecutive = inner.consecutive_failures,
                    threshold = self.config.consecutive_failure_threshold,
                    "Circuit breaker failure recorded"
                );
                if inner.consecutive_failures >= self.config.consecutive_failure_threshold {
                    warn!(
                        consecutive = inner.consecutive_failures,
                        "Circuit breaker opened"
                    );
                    inner.state = CircuitState::Open;
                    inner.last_state_change = Instant::now();
                }
            }
            CircuitState::HalfOpen => {
                warn!("Circuit breaker failure in half-open state, reopening");
                inner.state = CircuitState::Open;
                inner.success_count = 0;
                inner.consecutive_failures += 1;
                inner.last_state_change = Instant::now();
            }
            CircuitState::Open => {
                // Already open, nothing further to trip.
            }
        }
    }

    /// Force the breaker closed with all counters zeroed
    ///
    /// Used by operator intervention and by the health prober when a probe
    /// passes against a long-open circuit.
    pub fn reset(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            info!(state = %inner.state, "Circuit breaker reset to closed");
        }
        inner.close();
        inner.last_failure_time = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl BreakerInner {
    /// Transition to closed with all counters zeroed
    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.failures = 0;
        self.consecutive_failures = 0;
        self.success_count = 0;
        self.last_state_change = Instant::now();
    }
}

#[cfg(test)]
mod tests;
