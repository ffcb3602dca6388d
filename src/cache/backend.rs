//! The key-value cache the aggregate entry lives in.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub const INFO_KEYSPACE_HITS: &str = "keyspace_hits";
pub const INFO_KEYSPACE_MISSES: &str = "keyspace_misses";

#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not be reached or dropped the connection.
    #[error("cache backend unavailable: {message}")]
    Unavailable { message: String },
    /// The backend answered with something this client cannot interpret.
    #[error("cache backend protocol error: {message}")]
    Protocol { message: String },
}

impl BackendError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

/// Key-value cache with per-key expiry and backend-wide access counters.
///
/// Implementations own their counters: `get` is the only operation that moves
/// `keyspace_hits` / `keyspace_misses`, and nothing in this crate resets them.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, BackendError>;

    /// Store `value` under `key`, replacing any previous value. Last write wins.
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), BackendError>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), BackendError>;

    /// Out-of-band server statistics, at least the keyspace hit/miss counters.
    async fn raw_info(&self) -> Result<BackendInfo, BackendError>;
}

/// Flat `field -> value` statistics as reported by a backend.
///
/// Values are kept as text the way servers report them; readers decide how
/// to interpret a missing or malformed field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendInfo {
    fields: BTreeMap<String, String>,
}

impl BackendInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl ToString) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl ToString) {
        self.fields.insert(field.into(), value.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse `INFO`-style text: `field:value` lines, `#` section headers and
    /// blank lines ignored, CRLF or LF line endings.
    pub fn parse(text: &str) -> Self {
        let mut info = Self::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((field, value)) = line.split_once(':') {
                info.insert(field.trim(), value.trim());
            }
        }
        info
    }
}
