//! Redis-backed cache, shared across processes.
//!
//! Counters are the server's own `keyspace_hits` / `keyspace_misses`, read
//! from `INFO stats`.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::info;

use super::backend::{BackendError, BackendInfo, CacheBackend};

pub struct RedisBackend {
    connection: ConnectionManager,
}

impl RedisBackend {
    pub async fn connect(url: &str) -> Result<Self, BackendError> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        info!(backend = "redis", "Cache backend connected");
        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, BackendError> {
        let mut connection = self.connection.clone();
        let value: Option<Vec<u8>> = connection.get(key).await.map_err(map_redis_error)?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), BackendError> {
        let mut connection = self.connection.clone();
        // SET EX rejects zero; a zero lifetime means the value is never observable.
        if ttl.as_secs() == 0 {
            let _: () = connection.del(key).await.map_err(map_redis_error)?;
            return Ok(());
        }
        let _: () = connection
            .set_ex(key, value.as_ref(), ttl.as_secs())
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        let mut connection = self.connection.clone();
        let _: () = connection.del(key).await.map_err(map_redis_error)?;
        Ok(())
    }

    async fn raw_info(&self) -> Result<BackendInfo, BackendError> {
        let mut connection = self.connection.clone();
        let text: String = redis::cmd("INFO")
            .arg("stats")
            .query_async(&mut connection)
            .await
            .map_err(map_redis_error)?;
        Ok(BackendInfo::parse(&text))
    }
}

fn map_redis_error(err: redis::RedisError) -> BackendError {
    if err.is_io_error()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.is_timeout()
    {
        BackendError::unavailable(err.to_string())
    } else {
        BackendError::protocol(err.to_string())
    }
}
