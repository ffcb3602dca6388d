//! Backend-wide cache effectiveness.
//!
//! The counters come from the backend itself, so they cover every key and
//! every client of the backend, not only the aggregate entry this process
//! reads. Each call queries the backend live; nothing is memoised here.

use std::sync::Arc;

use metrics::gauge;
use serde::Serialize;
use tracing::{info, warn};

use super::backend::{
    BackendError, BackendInfo, CacheBackend, INFO_KEYSPACE_HITS, INFO_KEYSPACE_MISSES,
};

pub(crate) const METRIC_HIT_RATIO: &str = "properties_cache_hit_ratio";

const SEPARATOR: &str = "----------------------------------------";

/// Snapshot of the backend's cumulative hit/miss counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    /// Percentage in `[0, 100]`; exactly `0.0` when nothing has been looked up.
    pub hit_ratio: f64,
}

impl CacheMetrics {
    pub fn from_counters(hits: u64, misses: u64) -> Self {
        let total = hits.saturating_add(misses);
        let hit_ratio = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        Self {
            hits,
            misses,
            hit_ratio,
        }
    }
}

pub struct MetricsReporter {
    backend: Arc<dyn CacheBackend>,
}

impl MetricsReporter {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Query the backend counters and compute the hit ratio.
    ///
    /// Fails only when the backend itself cannot be reached; the call is not
    /// retried.
    pub async fn get_cache_metrics(&self) -> Result<CacheMetrics, BackendError> {
        let info = self.backend.raw_info().await?;
        let hits = read_counter(&info, INFO_KEYSPACE_HITS);
        let misses = read_counter(&info, INFO_KEYSPACE_MISSES);
        let metrics = CacheMetrics::from_counters(hits, misses);

        gauge!(METRIC_HIT_RATIO).set(metrics.hit_ratio);

        info!("{SEPARATOR}");
        info!(hits = metrics.hits, "Cache hits: {}", metrics.hits);
        info!(misses = metrics.misses, "Cache misses: {}", metrics.misses);
        info!(
            hit_ratio = metrics.hit_ratio,
            "Cache hit ratio: {:.2}%", metrics.hit_ratio
        );
        info!("{SEPARATOR}");

        Ok(metrics)
    }
}

fn read_counter(info: &BackendInfo, field: &'static str) -> u64 {
    match info.get(field) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(field, value = raw, "Backend counter is not an integer, using 0");
            0
        }),
        None => {
            warn!(field, "Backend counter missing, using 0");
            0
        }
    }
}
