//! Cache configuration.
//!
//! Controls the aggregate cache backend and the response cache window.

use std::num::NonZeroUsize;
use std::time::Duration;

// Default values for cache configuration
const DEFAULT_AGGREGATE_TTL_SECS: u64 = 3600;
const DEFAULT_MEMORY_MAX_ENTRIES: usize = 1024;
const DEFAULT_RESPONSE_TTL_SECS: u64 = 900;
const DEFAULT_RESPONSE_LIMIT: usize = 200;
const DEFAULT_RESPONSE_BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Where the aggregate cache lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    /// In-process LRU map with per-entry expiry.
    Memory,
    /// Shared Redis server; requires the `redis` cargo feature.
    Redis { url: String },
}

/// Resolved cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: BackendKind,
    /// Lifetime of the aggregate entry once populated.
    pub aggregate_ttl: Duration,
    /// Capacity of the in-memory backend.
    pub memory_max_entries: usize,
    /// Enable the full-response cache on the listing route.
    pub enable_response_cache: bool,
    /// Lifetime of a cached listing response.
    pub response_ttl: Duration,
    /// Maximum responses held by the response cache.
    pub response_limit: usize,
    /// Responses with larger bodies are passed through uncached.
    pub response_body_limit_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            aggregate_ttl: Duration::from_secs(DEFAULT_AGGREGATE_TTL_SECS),
            memory_max_entries: DEFAULT_MEMORY_MAX_ENTRIES,
            enable_response_cache: true,
            response_ttl: Duration::from_secs(DEFAULT_RESPONSE_TTL_SECS),
            response_limit: DEFAULT_RESPONSE_LIMIT,
            response_body_limit_bytes: DEFAULT_RESPONSE_BODY_LIMIT_BYTES,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        let backend = match settings.redis_url.as_ref() {
            Some(url) if settings.backend == crate::config::CacheBackendSetting::Redis => {
                BackendKind::Redis { url: url.clone() }
            }
            _ => BackendKind::Memory,
        };

        Self {
            backend,
            aggregate_ttl: settings.aggregate_ttl,
            memory_max_entries: settings.memory_max_entries.get(),
            enable_response_cache: settings.enable_response_cache,
            response_ttl: settings.response_ttl,
            response_limit: settings.response_limit.get(),
            response_body_limit_bytes: settings.response_body_limit_bytes.get(),
        }
    }
}

impl CacheConfig {
    /// Returns the memory backend capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_max_entries).unwrap_or(NonZeroUsize::MIN)
    }

    /// Returns the response cache capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn response_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.response_limit).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.aggregate_ttl, Duration::from_secs(3600));
        assert_eq!(config.response_ttl, Duration::from_secs(900));
        assert!(config.enable_response_cache);
        assert_eq!(config.memory_max_entries, 1024);
        assert_eq!(config.response_limit, 200);
        assert_eq!(config.response_body_limit_bytes, 1024 * 1024);
    }

    #[test]
    fn response_window_is_shorter_than_aggregate_ttl() {
        let config = CacheConfig::default();
        assert!(config.response_ttl < config.aggregate_ttl);
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            memory_max_entries: 0,
            response_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.memory_max_entries_non_zero().get(), 1);
        assert_eq!(config.response_limit_non_zero().get(), 1);
    }
}
