//! Steward LLM - Resilient inference-service client
//!
//! This crate turns an arbitrary call to a hosted, rate-limited, metered
//! inference API into a call with bounded cost, bounded latency, graceful
//! degradation under failure, and observable health:
//! - Breaker: three-state circuit breaker guarding all outbound calls
//! - RateLimit: sliding one-hour window with blocking and graceful policies
//! - Cache: content-addressable response cache with TTL
//! - Cost: per-day/month/model spend tracking against hard caps
//! - Retry: bounded exponential backoff around single attempts
//! - Health: periodic probing that can recover a long-open circuit
//! - Batch: optional request coalescing window
//! - Client: the façade composing all of the above into `generate`

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod breaker;
pub mod cache;
pub mod client;
pub mod config;
pub mod cost;
pub mod error;
pub mod gemini;
pub mod health;
pub mod provider;
pub mod rate_limit;
pub mod retry;
pub mod storage;
pub mod tier;

pub use batch::BatchQueue;
pub use breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use cache::{CacheEntry, ResponseCache};
pub use client::{GenerateOptions, InferenceClient};
pub use config::{ClientConfig, GenerationParams, TierModels};
pub use cost::{CostRecord, CostTracker, ModelPricing, SpendLimits};
pub use error::{Error, Result, SpendPeriod};
pub use gemini::{GeminiConfig, GeminiProvider};
pub use health::{HealthProber, HealthStatus};
pub use provider::{GeneratedText, InferenceProvider, MockProvider};
pub use rate_limit::{RateLimitStatus, RateLimiter};
pub use retry::{retry_with_backoff, RetryConfig, RetryError};
pub use storage::{FsStorage, MemoryStorage, Storage};
pub use tier::{estimate_tokens, select_model, ModelTier};
