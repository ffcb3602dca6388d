//! Cache-aside read of the full property collection.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use metrics::counter;
use thiserror::Error;
use tracing::debug;

use super::CacheError;
use super::backend::{BackendError, CacheBackend};
use super::keys::AGGREGATE_KEY;
use crate::application::repos::{PropertiesRepo, RepoError};
use crate::domain::entities::PropertyRecord;

pub(crate) const METRIC_AGGREGATE_HIT_TOTAL: &str = "properties_cache_aggregate_hit_total";
pub(crate) const METRIC_AGGREGATE_MISS_TOTAL: &str = "properties_cache_aggregate_miss_total";

#[derive(Debug, Error)]
pub enum ListingError {
    #[error(transparent)]
    Store(#[from] RepoError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl From<BackendError> for ListingError {
    fn from(err: BackendError) -> Self {
        Self::Cache(CacheError::Backend(err))
    }
}

/// Serves the property collection from the backend, falling back to the
/// store and repopulating the aggregate entry on miss.
pub struct PropertyReader {
    backend: Arc<dyn CacheBackend>,
    store: Arc<dyn PropertiesRepo>,
    ttl: Duration,
}

impl PropertyReader {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        store: Arc<dyn PropertiesRepo>,
        ttl: Duration,
    ) -> Self {
        Self {
            backend,
            store,
            ttl,
        }
    }

    /// Return every property, in store order.
    ///
    /// A cached value is returned as-is even if the store has changed since;
    /// freshness relies on write-path invalidation and the entry's TTL. Two
    /// concurrent misses may both query the store and both populate the key.
    pub async fn get_all_records(&self) -> Result<Vec<PropertyRecord>, ListingError> {
        if let Some(payload) = self.backend.get(AGGREGATE_KEY).await? {
            let records: Vec<PropertyRecord> =
                serde_json::from_slice(&payload).map_err(CacheError::from)?;
            counter!(METRIC_AGGREGATE_HIT_TOTAL).increment(1);
            debug!(key = AGGREGATE_KEY, records = records.len(), "Aggregate cache hit");
            return Ok(records);
        }

        counter!(METRIC_AGGREGATE_MISS_TOTAL).increment(1);
        debug!(key = AGGREGATE_KEY, "Aggregate cache miss, querying store");

        let records = self.store.list_all().await?;
        let payload = serde_json::to_vec(&records).map_err(CacheError::from)?;
        self.backend
            .set(AGGREGATE_KEY, Bytes::from(payload), self.ttl)
            .await?;

        debug!(
            key = AGGREGATE_KEY,
            records = records.len(),
            ttl_seconds = self.ttl.as_secs(),
            "Aggregate cache populated"
        );
        Ok(records)
    }
}
