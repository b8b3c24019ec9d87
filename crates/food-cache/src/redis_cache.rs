//! Redis-backed cache. Values are opaque bytes stored with `PSETEX`, so
//! expiry keeps millisecond precision.

use std::time::Duration;

use async_trait::async_trait;
use food_types::ports::cache::{CacheBackend, CacheError};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

fn backend_err(e: redis::RedisError) -> CacheError {
    CacheError::Backend(e.to_string())
}

/// PSETEX rejects a zero expiry.
fn expiry_ms(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[derive(Clone)]
pub struct RedisCache {
    conn_manager: ConnectionManager,
}

impl RedisCache {
    /// Opens a managed connection and checks it with `PING`.
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = Client::open(redis_url)?;
        let conn_manager = tokio::time::timeout(CONNECT_TIMEOUT, ConnectionManager::new(client))
            .await
            .map_err(|_| anyhow::anyhow!("timed out connecting to redis after {CONNECT_TIMEOUT:?}"))??;
        let cache = Self { conn_manager };
        cache.ping().await?;
        Ok(cache)
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn_manager.clone();
        conn.get(key).await.map_err(backend_err)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn_manager.clone();
        let _: () = conn
            .pset_ex(key, value, expiry_ms(ttl))
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn_manager.clone();
        let _: () = conn.del(keys).await.map_err(backend_err)?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn_manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(backend_err)?;
        Ok(())
    }
}
