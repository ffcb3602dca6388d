//! Response cache storage.
//!
//! Rendered listing responses, held in process for a fixed window. Entries
//! are never invalidated by writes; they age out or fall off the LRU tail.

use std::sync::RwLock;
use std::time::Duration;

use bytes::Bytes;
use lru::LruCache;
use tokio::time::Instant;

use super::config::CacheConfig;
use super::keys::L1Key;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Cached HTTP response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

struct StoredResponse {
    response: CachedResponse,
    expires_at: Instant,
}

pub struct ResponseStore {
    responses: RwLock<LruCache<L1Key, StoredResponse>>,
    ttl: Duration,
}

impl ResponseStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            responses: RwLock::new(LruCache::new(config.response_limit_non_zero())),
            ttl: config.response_ttl,
        }
    }

    pub fn get(&self, key: &L1Key) -> Option<CachedResponse> {
        let now = Instant::now();
        let mut responses = rw_write(&self.responses, SOURCE, "get");

        match responses.get(key) {
            Some(stored) if now < stored.expires_at => Some(stored.response.clone()),
            Some(_) => {
                responses.pop(key);
                None
            }
            None => None,
        }
    }

    /// Store a response, returning the key pushed off the LRU tail, if any.
    pub fn set(&self, key: L1Key, response: CachedResponse) -> Option<L1Key> {
        let stored = StoredResponse {
            response,
            expires_at: Instant::now() + self.ttl,
        };
        rw_write(&self.responses, SOURCE, "set")
            .push(key.clone(), stored)
            .map(|(evicted_key, _)| evicted_key)
            .filter(|evicted_key| *evicted_key != key)
    }

    pub fn len(&self) -> usize {
        rw_read(&self.responses, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
