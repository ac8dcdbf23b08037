//! Inference client façade
//!
//! Composes tier selection, spend limits, the circuit breaker, the response
//! cache, the rate limiter, and the retry executor into one `generate`
//! operation. Constructed once by the application entry point and passed by
//! reference; there is no global accessor.

use crate::breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig};
use crate::cache::ResponseCache;
use crate::config::ClientConfig;
use crate::cost::{CostRecord, CostTracker, SpendLimits};
use crate::error::{Error, Result};
use crate::health::{HealthProber, HealthStatus};
use crate::provider::InferenceProvider;
use crate::rate_limit::{RateLimitStatus, RateLimiter};
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::storage::Storage;
use crate::tier;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Per-call options for [`InferenceClient::generate`]
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Use this model verbatim, bypassing tier selection
    pub force_model: Option<String>,
    /// Skip the response cache for this call (read and fallback)
    pub skip_cache: bool,
    /// Ask the provider for an exact token count when usage metadata is
    /// missing, instead of the length/4 estimate
    pub check_tokens: bool,
    /// Fail fast with [`Error::RateLimited`] instead of blocking when the
    /// hourly window is full
    pub graceful_rate_limit: bool,
}

impl GenerateOptions {
    /// Force a specific model
    #[must_use]
    pub fn with_force_model(mut self, model: impl Into<String>) -> Self {
        self.force_model = Some(model.into());
        self
    }

    /// Skip the cache
    #[must_use]
    pub fn with_skip_cache(mut self, skip: bool) -> Self {
        self.skip_cache = skip;
        self
    }

    /// Request an exact token count for cost accounting
    #[must_use]
    pub fn with_check_tokens(mut self, check: bool) -> Self {
        self.check_tokens = check;
        self
    }

    /// Enable graceful rate limiting
    #[must_use]
    pub fn with_graceful_rate_limit(mut self, graceful: bool) -> Self {
        self.graceful_rate_limit = graceful;
        self
    }
}

/// Resilient client for a hosted, rate-limited, metered inference API
pub struct InferenceClient {
    config: ClientConfig,
    provider: Arc<dyn InferenceProvider>,
    breaker: Arc<CircuitBreaker>,
    limiter: RateLimiter,
    cache: ResponseCache,
    cost: CostTracker,
    retry: RetryConfig,
    prober: HealthProber,
}

impl InferenceClient {
    /// Create a client over the given provider and storage backend
    pub fn new(
        config: ClientConfig,
        provider: Arc<dyn InferenceProvider>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self> {
        config.validate()?;

        let breaker = Arc::new(CircuitBreaker::new(
            CircuitBreakerConfig::new()
                .with_consecutive_failure_threshold(config.consecutive_failure_threshold)
                .with_half_open_success_threshold(config.half_open_success_threshold)
                .with_recovery_timeout(config.recovery_timeout),
        ));
        let limiter = RateLimiter::hourly(config.hourly_rate_limit);
        let cache = ResponseCache::new(storage.clone(), config.cache_ttl, config.cache_enabled);
        let cost = CostTracker::new(
            storage,
            SpendLimits {
                daily: config.daily_spend_limit,
                monthly: config.monthly_spend_limit,
                alert_threshold: config.alert_threshold,
            },
        );
        let retry = RetryConfig::new(config.retry_attempts, config.retry_delay);
        let prober = HealthProber::new(
            provider.clone(),
            breaker.clone(),
            config.tiers.cheap.clone(),
            config.health_check_interval,
            config.recovery_timeout,
        );

        Ok(Self {
            config,
            provider,
            breaker,
            limiter,
            cache,
            cost,
            retry,
            prober,
        })
    }

    /// Generate text for a prompt through the full resilience pipeline
    ///
    /// Order: tier selection, spending limits, circuit breaker, cache,
    /// rate limiter, then the retried network call. A cache hit
    /// short-circuits the live call and still counts as a breaker success.
    /// When the circuit is open or the rate window is full and a cached
    /// response exists, the cached text is substituted and returned as a
    /// success.
    #[instrument(skip(self, prompt, options), fields(prompt_len = prompt.len()))]
    pub async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String> {
        let model = tier::select_model(prompt, &self.config, options.force_model.as_deref());

        // The spend check precedes everything paid-adjacent, including the
        // cache lookup.
        self.cost.check_limits()?;

        if let Err(e) = self.breaker.check() {
            if let Some(cached) = self.degraded_lookup(prompt, &model, options) {
                warn!(model = %model, error = %e, "Circuit open, serving cached response");
                return Ok(cached);
            }
            return Err(e);
        }

        if !options.skip_cache {
            if let Some(cached) = self.cache.get(prompt, &model) {
                debug!(model = %model, "Serving cached response");
                self.breaker.record_success();
                return Ok(cached);
            }
        }

        if let Err(e) = self.limiter.acquire(options.graceful_rate_limit).await {
            if let Some(cached) = self.degraded_lookup(prompt, &model, options) {
                warn!(model = %model, error = %e, "Rate limited, serving cached response");
                return Ok(cached);
            }
            return Err(e);
        }

        self.attempt_live(prompt, &model, options).await
    }

    /// The retried network call plus success-side bookkeeping
    async fn attempt_live(
        &self,
        prompt: &str,
        model: &str,
        options: &GenerateOptions,
    ) -> Result<String> {
        let timeout = self.config.request_timeout;
        let provider = Arc::clone(&self.provider);
        let params = self.config.params.clone();
        let model_owned = model.to_string();
        let prompt_owned = prompt.to_string();

        let outcome = retry_with_backoff(
            &self.retry,
            move || {
                let provider = Arc::clone(&provider);
                let model = model_owned.clone();
                let prompt = prompt_owned.clone();
                let params = params.clone();
                async move {
                    match tokio::time::timeout(
                        timeout,
                        provider.generate_content(&model, &prompt, &params),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(Error::Timeout(timeout.as_millis() as u64)),
                    }
                }
            },
            Error::is_transient,
        )
        .await;

        match outcome {
            Ok(generated) => {
                self.breaker.record_success();

                let input_tokens = match generated.input_tokens {
                    Some(tokens) => tokens,
                    None if options.check_tokens => {
                        match self.provider.count_tokens(model, prompt).await {
                            Ok(tokens) => tokens,
                            Err(e) => {
                                debug!(error = %e, "Token count failed, falling back to estimate");
                                tier::estimate_tokens(prompt)
                            }
                        }
                    }
                    None => tier::estimate_tokens(prompt),
                };
                let output_tokens = generated
                    .output_tokens
                    .unwrap_or_else(|| tier::estimate_tokens(&generated.text));

                let cost = self.cost.track(model, input_tokens, output_tokens);

                if let Err(e) = self.cache.put(prompt, model, &generated.text) {
                    warn!(error = %e, "Failed to write cache entry");
                }

                info!(
                    model = %model,
                    input_tokens = input_tokens,
                    output_tokens = output_tokens,
                    cost = %format!("${cost:.6}"),
                    "Generation complete"
                );
                Ok(generated.text)
            }
            Err(retry_err) => {
                // One logical call reports exactly one failure, regardless of
                // how many internal attempts it burned.
                self.breaker.record_failure();
                warn!(
                    model = %model,
                    attempts = retry_err.attempts,
                    error = %retry_err.last_error,
                    "Generation failed"
                );
                Err(retry_err.last_error)
            }
        }
    }

    fn degraded_lookup(&self, prompt: &str, model: &str, options: &GenerateOptions) -> Option<String> {
        if options.skip_cache {
            return None;
        }
        self.cache.get(prompt, model)
    }

    /// Run (or reuse) a health probe
    pub async fn health_check(&self) -> HealthStatus {
        self.prober.perform_health_check().await
    }

    /// Current spend record
    #[must_use]
    pub fn usage(&self) -> CostRecord {
        self.cost.snapshot()
    }

    /// Compact spend summary for operator logs
    #[must_use]
    pub fn usage_summary(&self) -> String {
        self.cost.format_usage()
    }

    /// Current breaker state and counters
    #[must_use]
    pub fn breaker_snapshot(&self) -> BreakerSnapshot {
        self.breaker.snapshot()
    }

    /// Current rate-limit window status
    #[must_use]
    pub fn rate_limit_status(&self) -> RateLimitStatus {
        self.limiter.status()
    }

    /// Force the circuit breaker closed (operator intervention)
    pub fn reset_breaker(&self) {
        self.breaker.reset();
    }

    /// The client configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}
