//! Periodic service health probing
//!
//! A probe is a minimal generation request, independent of normal traffic.
//! Results are cached for the configured interval so repeated checks are
//! free. A passing probe against a circuit that has been open for more than
//! twice the recovery timeout force-resets the breaker - the only recovery
//! path that does not route live traffic through half-open probation.

use crate::breaker::CircuitBreaker;
use crate::config::GenerationParams;
use crate::provider::InferenceProvider;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Prompt used for probe requests
const PROBE_PROMPT: &str = "ping";

/// Result of a health probe
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Whether the probe succeeded
    pub healthy: bool,
    /// Probe round-trip latency
    pub latency_ms: u64,
    /// When the probe ran
    pub checked_at: DateTime<Utc>,
}

struct CachedProbe {
    status: HealthStatus,
    at: Instant,
}

/// Periodic lightweight prober sharing the client's breaker
pub struct HealthProber {
    provider: Arc<dyn InferenceProvider>,
    breaker: Arc<CircuitBreaker>,
    probe_model: String,
    interval: Duration,
    recovery_timeout: Duration,
    cached: Mutex<Option<CachedProbe>>,
}

impl HealthProber {
    /// Create a prober
    pub fn new(
        provider: Arc<dyn InferenceProvider>,
        breaker: Arc<CircuitBreaker>,
        probe_model: impl Into<String>,
        interval: Duration,
        recovery_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            breaker,
            probe_model: probe_model.into(),
            interval,
            recovery_timeout,
            cached: Mutex::new(None),
        }
    }

    /// Run a health check, reusing a fresh cached result when available
    pub async fn perform_health_check(&self) -> HealthStatus {
        if let Some(cached) = self.fresh_cached() {
            debug!(healthy = cached.healthy, "Health check served from cache");
            return cached;
        }

        let params = GenerationParams {
            temperature: 0.0,
            top_p: 1.0,
            top_k: 1,
            max_output_tokens: 8,
        };

        let start = Instant::now();
        let outcome = self
            .provider
            .generate_content(&self.probe_model, PROBE_PROMPT, &params)
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let healthy = outcome.is_ok();
        match outcome {
            Ok(_) => {
                let stuck_open = self
                    .breaker
                    .opened_for()
                    .map(|open_for| open_for > self.recovery_timeout * 2)
                    .unwrap_or(false);
                if stuck_open {
                    info!(
                        latency_ms = latency_ms,
                        "Probe passed against long-open circuit, forcing reset"
                    );
                    self.breaker.reset();
                } else {
                    self.breaker.record_success();
                }
            }
            Err(e) => {
                warn!(error = %e, latency_ms = latency_ms, "Health probe failed");
                self.breaker.record_failure();
            }
        }

        let status = HealthStatus {
            healthy,
            latency_ms,
            checked_at: Utc::now(),
        };

        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        *cached = Some(CachedProbe {
            status: status.clone(),
            at: Instant::now(),
        });
        status
    }

    fn fresh_cached(&self) -> Option<HealthStatus> {
        let cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        cached
            .as_ref()
            .filter(|probe| probe.at.elapsed() < self.interval)
            .map(|probe| probe.status.clone())
    }
}
