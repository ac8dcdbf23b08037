//! Client configuration
//!
//! All knobs of the resilience pipeline live here, with defaults matching
//! the production deployment and validation at construction time.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Model names for each cost tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierModels {
    /// Cheapest tier, for short prompts
    pub cheap: String,
    /// Mid tier, for typical prompts
    pub standard: String,
    /// Premium tier, for large prompts
    pub premium: String,
}

impl Default for TierModels {
    fn default() -> Self {
        Self {
            cheap: "gemini-2.5-flash-lite".to_string(),
            standard: "gemini-2.5-flash".to_string(),
            premium: "gemini-2.5-pro".to_string(),
        }
    }
}

/// Sampling parameters, fixed per client instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling cutoff
    pub top_p: f32,
    /// Top-k sampling cutoff
    pub top_k: u32,
    /// Maximum tokens in the response
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
        }
    }
}

/// Full configuration for [`crate::client::InferenceClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Model name per tier
    pub tiers: TierModels,
    /// Prompts estimated below this many tokens use the cheap tier
    pub simple_threshold: u32,
    /// Prompts estimated below this many tokens use the standard tier
    pub standard_threshold: u32,
    /// Sampling parameters applied to every request
    pub params: GenerationParams,

    /// Maximum calls in any trailing hour
    pub hourly_rate_limit: u32,

    /// Maximum attempts per logical call
    pub retry_attempts: u32,
    /// Base delay before the first retry (doubles each attempt)
    pub retry_delay: Duration,
    /// Per-attempt network timeout
    pub request_timeout: Duration,

    /// Whether the response cache is consulted at all
    pub cache_enabled: bool,
    /// Entries older than this are treated as misses
    pub cache_ttl: Duration,
    /// Root directory for cache and cost files
    pub state_dir: PathBuf,

    /// Consecutive failures that open the circuit
    pub consecutive_failure_threshold: u32,
    /// Successes in half-open state needed to close the circuit
    pub half_open_success_threshold: u32,
    /// How long the circuit stays open before admitting a probe
    pub recovery_timeout: Duration,

    /// Daily spend hard cap (USD)
    pub daily_spend_limit: f64,
    /// Monthly spend hard cap (USD)
    pub monthly_spend_limit: f64,
    /// Fraction of a budget that triggers a warning (0.0 – 1.0)
    pub alert_threshold: f64,

    /// How long a health probe result stays fresh
    pub health_check_interval: Duration,

    /// How long the batch queue accumulates before flushing
    pub batch_delay: Duration,
    /// Maximum items processed per batch flush
    pub batch_max_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let state_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".steward");
        Self {
            tiers: TierModels::default(),
            simple_threshold: 500,
            standard_threshold: 4_000,
            params: GenerationParams::default(),
            hourly_rate_limit: 60,
            retry_attempts: 3,
            retry_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(60),
            cache_enabled: true,
            cache_ttl: Duration::from_secs(24 * 3600),
            state_dir,
            consecutive_failure_threshold: 3,
            half_open_success_threshold: 2,
            recovery_timeout: Duration::from_secs(60),
            daily_spend_limit: 5.0,
            monthly_spend_limit: 50.0,
            alert_threshold: 0.8,
            health_check_interval: Duration::from_secs(300),
            batch_delay: Duration::from_secs(2),
            batch_max_size: 10,
        }
    }
}

impl ClientConfig {
    /// Create a configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set tier model names
    #[must_use]
    pub fn with_tiers(mut self, tiers: TierModels) -> Self {
        self.tiers = tiers;
        self
    }

    /// Set tier selection thresholds (estimated tokens)
    #[must_use]
    pub fn with_tier_thresholds(mut self, simple: u32, standard: u32) -> Self {
        self.simple_threshold = simple;
        self.standard_threshold = standard;
        self
    }

    /// Set the hourly rate limit
    #[must_use]
    pub fn with_hourly_rate_limit(mut self, limit: u32) -> Self {
        self.hourly_rate_limit = limit;
        self
    }

    /// Set retry attempts and base delay
    #[must_use]
    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    /// Set the per-attempt timeout
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Enable or disable the response cache
    #[must_use]
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Set the cache TTL
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the on-disk state directory
    #[must_use]
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    /// Set circuit breaker thresholds
    #[must_use]
    pub fn with_breaker(
        mut self,
        consecutive_failures: u32,
        half_open_successes: u32,
        recovery_timeout: Duration,
    ) -> Self {
        self.consecutive_failure_threshold = consecutive_failures;
        self.half_open_success_threshold = half_open_successes;
        self.recovery_timeout = recovery_timeout;
        self
    }

    /// Set spend limits
    #[must_use]
    pub fn with_spend_limits(mut self, daily: f64, monthly: f64) -> Self {
        self.daily_spend_limit = daily;
        self.monthly_spend_limit = monthly;
        self
    }

    /// Set the budget alert threshold (fraction, 0.0 – 1.0)
    #[must_use]
    pub fn with_alert_threshold(mut self, threshold: f64) -> Self {
        self.alert_threshold = threshold;
        self
    }

    /// Set the health probe cache interval
    #[must_use]
    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }

    /// Set batch window and capacity
    #[must_use]
    pub fn with_batch(mut self, delay: Duration, max_size: usize) -> Self {
        self.batch_delay = delay;
        self.batch_max_size = max_size;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.simple_threshold >= self.standard_threshold {
            return Err(Error::Config(format!(
                "simple_threshold ({}) must be below standard_threshold ({})",
                self.simple_threshold, self.standard_threshold
            )));
        }
        if self.hourly_rate_limit == 0 {
            return Err(Error::Config("hourly_rate_limit must be positive".into()));
        }
        if self.retry_attempts == 0 {
            return Err(Error::Config("retry_attempts must be at least 1".into()));
        }
        if self.daily_spend_limit <= 0.0 || self.monthly_spend_limit <= 0.0 {
            return Err(Error::Config("spend limits must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.alert_threshold) {
            return Err(Error::Config(format!(
                "alert_threshold must be within 0.0..=1.0, got {}",
                self.alert_threshold
            )));
        }
        if self.batch_max_size == 0 {
            return Err(Error::Config("batch_max_size must be at least 1".into()));
        }
        Ok(())
    }
}
