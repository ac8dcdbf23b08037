//! Error types for steward-llm

use thiserror::Error;

/// Spend period that tripped a hard cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpendPeriod {
    /// Daily budget
    Daily,
    /// Monthly budget
    Monthly,
}

impl std::fmt::Display for SpendPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

/// Inference client error type
#[derive(Debug, Error)]
pub enum Error {
    /// Circuit breaker is open and the recovery timeout has not elapsed
    #[error("circuit open: retry in {retry_after_secs}s ({consecutive_failures} consecutive failures)")]
    CircuitOpen {
        /// Seconds until the breaker will admit a probationary request
        retry_after_secs: u64,
        /// Consecutive failures that opened the circuit
        consecutive_failures: u32,
    },

    /// Hourly rate limit exhausted under the graceful policy
    #[error("rate limit exceeded: {current}/{limit} calls, retry in {retry_after_ms}ms")]
    RateLimited {
        /// Milliseconds until the oldest call exits the window
        retry_after_ms: u64,
        /// Calls currently in the window
        current: u32,
        /// Configured hourly limit
        limit: u32,
    },

    /// Daily or monthly spend hard cap reached
    #[error("{period} spending limit reached: ${spent:.4} of ${limit:.2}")]
    SpendingLimit {
        /// Which budget was breached
        period: SpendPeriod,
        /// Spend accumulated so far (USD)
        spent: f64,
        /// Configured hard cap (USD)
        limit: f64,
    },

    /// API error with an HTTP status, when known
    #[error("api error: {message}")]
    Api {
        /// HTTP status code, if the response carried one
        status: Option<u16>,
        /// Sanitized error message
        message: String,
    },

    /// Network error (connect, reset, DNS)
    #[error("network error: {0}")]
    Network(String),

    /// Request exceeded the per-attempt timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Response arrived but could not be interpreted
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Persistence layer failure (cache/cost files)
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid configuration rejected at construction
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Internal failure (worker gone, channel closed)
    #[error("internal error: {0}")]
    Internal(String),
}

/// HTTP statuses treated as transient.
const TRANSIENT_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

/// Substrings in network error text that indicate a transient failure.
const TRANSIENT_SIGNATURES: &[&str] = &[
    "connection reset",
    "connection refused",
    "broken pipe",
    "timed out",
    "timeout",
    "dns error",
    "failed to lookup",
    "temporarily unavailable",
];

impl Error {
    /// Whether this error class is worth retrying.
    ///
    /// Circuit-open, rate-limited, and spending-limit conditions are never
    /// retryable: the retry executor would only be hammering a known-bad or
    /// known-throttled service.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Api { status: Some(s), .. } => TRANSIENT_STATUSES.contains(s),
            Self::Network(msg) => {
                let lower = msg.to_lowercase();
                TRANSIENT_SIGNATURES.iter().any(|sig| lower.contains(sig))
            }
            _ => false,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
