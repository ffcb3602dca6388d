//! In-process cache backend.
//!
//! An LRU-bounded map with a deadline per entry. Expired entries are purged
//! when touched and count as misses, so the counters behave like a remote
//! server's keyspace statistics.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;

use super::backend::{
    BackendError, BackendInfo, CacheBackend, INFO_KEYSPACE_HITS, INFO_KEYSPACE_MISSES,
};
use super::lock::mutex_lock;

const SOURCE: &str = "cache::memory";

pub(crate) const METRIC_BACKEND_HIT_TOTAL: &str = "properties_cache_backend_hit_total";
pub(crate) const METRIC_BACKEND_MISS_TOTAL: &str = "properties_cache_backend_miss_total";
pub(crate) const METRIC_BACKEND_EVICT_TOTAL: &str = "properties_cache_backend_evict_total";
pub(crate) const METRIC_BACKEND_EXPIRED_TOTAL: &str = "properties_cache_backend_expired_total";

struct MemoryEntry {
    value: Bytes,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    evicted: AtomicU64,
}

pub struct MemoryBackend {
    entries: Mutex<LruCache<String, MemoryEntry>>,
    counters: Counters,
}

impl MemoryBackend {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            counters: Counters::default(),
        }
    }

    fn record_hit(&self) {
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        counter!(METRIC_BACKEND_HIT_TOTAL).increment(1);
    }

    fn record_miss(&self) {
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        counter!(METRIC_BACKEND_MISS_TOTAL).increment(1);
    }

    fn record_expired(&self) {
        self.counters.expired.fetch_add(1, Ordering::Relaxed);
        counter!(METRIC_BACKEND_EXPIRED_TOTAL).increment(1);
    }

    fn record_evicted(&self) {
        self.counters.evicted.fetch_add(1, Ordering::Relaxed);
        counter!(METRIC_BACKEND_EVICT_TOTAL).increment(1);
    }

    /// Number of live (unexpired) keys.
    pub fn live_keys(&self) -> usize {
        let now = Instant::now();
        mutex_lock(&self.entries, SOURCE, "live_keys")
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .count()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, BackendError> {
        let now = Instant::now();
        let mut entries = mutex_lock(&self.entries, SOURCE, "get");

        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                let value = entry.value.clone();
                drop(entries);
                self.record_hit();
                return Ok(Some(value));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
        }
        drop(entries);

        if expired {
            self.record_expired();
        }
        self.record_miss();
        Ok(None)
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), BackendError> {
        let mut entries = mutex_lock(&self.entries, SOURCE, "set");

        // A zero lifetime means the value is never observable.
        if ttl.is_zero() {
            entries.pop(key);
            return Ok(());
        }

        let entry = MemoryEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        let displaced = entries.push(key.to_string(), entry);
        drop(entries);

        if matches!(displaced, Some((displaced_key, _)) if displaced_key != key) {
            self.record_evicted();
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        mutex_lock(&self.entries, SOURCE, "delete").pop(key);
        Ok(())
    }

    async fn raw_info(&self) -> Result<BackendInfo, BackendError> {
        Ok(BackendInfo::new()
            .with(INFO_KEYSPACE_HITS, self.counters.hits.load(Ordering::Relaxed))
            .with(INFO_KEYSPACE_MISSES, self.counters.misses.load(Ordering::Relaxed))
            .with("expired_keys", self.counters.expired.load(Ordering::Relaxed))
            .with("evicted_keys", self.counters.evicted.load(Ordering::Relaxed))
            .with("keys", self.live_keys()))
    }
}
