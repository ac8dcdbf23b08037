//! Content-addressable response cache
//!
//! Entries are keyed by a SHA-256 of (model, prompt) and stored as JSON
//! through the [`Storage`] seam. Caching is a pure optimization layer:
//! corrupt or unreadable entries are misses, never errors.

use crate::error::Result;
use crate::storage::Storage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Characters of the prompt kept in the entry for operator inspection
const PROMPT_PREVIEW_LEN: usize = 120;

/// A cached generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Truncated prompt, for human inspection of cache files
    pub prompt_preview: String,
    /// Full response text
    pub response: String,
    /// Model that produced the response
    pub model: String,
    /// When the entry was written
    pub created_at: DateTime<Utc>,
}

/// TTL-bounded response cache over a [`Storage`] backend
pub struct ResponseCache {
    storage: Arc<dyn Storage>,
    ttl: Duration,
    enabled: bool,
}

impl ResponseCache {
    /// Create a cache with the given backend and TTL
    pub fn new(storage: Arc<dyn Storage>, ttl: Duration, enabled: bool) -> Self {
        Self {
            storage,
            ttl,
            enabled,
        }
    }

    /// Deterministic key for a (prompt, model) pair
    #[must_use]
    pub fn key(prompt: &str, model: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update(b"\n");
        hasher.update(prompt.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Look up a cached response
    ///
    /// Returns `None` when disabled, absent, expired, written by a different
    /// model, or unparseable. Expired entries are evicted lazily on read.
    pub fn get(&self, prompt: &str, model: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let key = Self::key(prompt, model);
        let raw = match self.storage.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                debug!(error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, error = %e, "Corrupt cache entry, treating as miss");
                return None;
            }
        };

        if entry.model != model {
            return None;
        }

        let age = Utc::now().signed_duration_since(entry.created_at);
        let expired = age
            .to_std()
            .map(|age| age >= self.ttl)
            // A future created_at means clock skew; keep serving the entry.
            .unwrap_or(false);
        if expired {
            debug!(key = %key, "Cache entry expired, evicting");
            let _ = self.storage.remove(&key);
            return None;
        }

        debug!(key = %key, model = model, "Cache hit");
        Some(entry.response)
    }

    /// Store a response, overwriting any existing entry for the key
    pub fn put(&self, prompt: &str, model: &str, response: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let entry = CacheEntry {
            prompt_preview: prompt.chars().take(PROMPT_PREVIEW_LEN).collect(),
            response: response.to_string(),
            model: model.to_string(),
            created_at: Utc::now(),
        };

        let key = Self::key(prompt, model);
        let raw = serde_json::to_string(&entry)
            .map_err(|e| crate::error::Error::Storage(format!("serialize cache entry: {e}")))?;
        self.storage.put(&key, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn cache(ttl: Duration) -> ResponseCache {
        ResponseCache::new(Arc::new(MemoryStorage::new()), ttl, true)
    }

    #[test]
    fn test_roundtrip() {
        let cache = cache(Duration::from_secs(3600));
        cache.put("prompt", "model-a", "the response").unwrap();
        assert_eq!(
            cache.get("prompt", "model-a").as_deref(),
            Some("the response")
        );
    }

    #[test]
    fn test_model_mismatch_is_miss() {
        let cache = cache(Duration::from_secs(3600));
        cache.put("prompt", "model-a", "the response").unwrap();
        assert_eq!(cache.get("prompt", "model-b"), None);
    }

    #[test]
    fn test_ttl_expiry_is_miss() {
        let cache = cache(Duration::from_millis(20));
        cache.put("prompt", "model-a", "the response").unwrap();
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("prompt", "model-a"), None);
    }

    #[test]
    fn test_put_overwrites() {
        let cache = cache(Duration::from_secs(3600));
        cache.put("prompt", "model-a", "first").unwrap();
        cache.put("prompt", "model-a", "second").unwrap();
        assert_eq!(cache.get("prompt", "model-a").as_deref(), Some("second"));
    }

    #[test]
    fn test_corrupt_entry_is_miss() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = ResponseCache::new(storage.clone(), Duration::from_secs(3600), true);

        let key = ResponseCache::key("prompt", "model-a");
        storage.put(&key, "not valid json {").unwrap();
        assert_eq!(cache.get("prompt", "model-a"), None);
    }

    #[test]
    fn test_disabled_cache_never_hits() {
        let cache = ResponseCache::new(
            Arc::new(MemoryStorage::new()),
            Duration::from_secs(3600),
            false,
        );
        cache.put("prompt", "model-a", "the response").unwrap();
        assert_eq!(cache.get("prompt", "model-a"), None);
    }

    #[test]
    fn test_key_is_deterministic_and_distinct() {
        let a = ResponseCache::key("prompt", "model-a");
        let b = ResponseCache::key("prompt", "model-a");
        let c = ResponseCache::key("prompt", "model-b");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
