//! Property Cache System
//!
//! Two independent layers sit in front of the property store:
//!
//! - **Aggregate cache**: the full property collection stored in a
//!   [`CacheBackend`] under a single well-known key. Populated on miss by
//!   [`PropertyReader`], deleted on every store write by
//!   [`InvalidationListener`], expired by the backend after its TTL.
//! - **Response cache**: rendered listing responses held in process for a
//!   coarser window. Writes do not touch it; entries age out on their own.
//!
//! [`MetricsReporter`] reads the backend's own cumulative hit/miss counters,
//! so its ratio covers every key on the backend rather than only the aggregate.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! backend = "memory"
//! aggregate_ttl_seconds = 3600
//! response_ttl_seconds = 900
//! # ... see config.rs for all options
//! ```

mod backend;
mod config;
mod invalidation;
mod keys;
pub(crate) mod lock;
mod memory;
mod middleware;
mod reader;
#[cfg(feature = "redis")]
mod redis;
mod reporter;
mod store;

use std::sync::Arc;

use thiserror::Error;

pub use backend::{BackendError, BackendInfo, CacheBackend};
pub use config::{BackendKind, CacheConfig};
pub use invalidation::InvalidationListener;
pub use keys::{AGGREGATE_KEY, L1Key, hash_query};
pub use memory::MemoryBackend;
pub use middleware::{CacheState, response_cache_layer};
pub use reader::{ListingError, PropertyReader};
#[cfg(feature = "redis")]
pub use redis::RedisBackend;
pub use reporter::{CacheMetrics, MetricsReporter};
pub use store::{CachedResponse, ResponseStore};

/// Failure of a cache operation performed on behalf of the application.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("cached payload could not be decoded: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Build the configured backend. Called once per process; the result is
/// shared by the reader, the invalidation listener, and the reporter.
pub async fn connect_backend(
    config: &CacheConfig,
) -> Result<Arc<dyn CacheBackend>, BackendError> {
    match &config.backend {
        BackendKind::Memory => Ok(Arc::new(MemoryBackend::new(
            config.memory_max_entries_non_zero(),
        ))),
        #[cfg(feature = "redis")]
        BackendKind::Redis { url } => Ok(Arc::new(RedisBackend::connect(url).await?)),
        #[cfg(not(feature = "redis"))]
        BackendKind::Redis { .. } => Err(BackendError::unavailable(
            "redis backend requested but this build lacks the `redis` feature",
        )),
    }
}
