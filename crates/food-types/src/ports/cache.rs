use std::time::Duration;

use async_trait::async_trait;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("cache payload codec error: {0}")]
    Codec(String),
}

/// Byte-oriented key/value store with per-key expiry.
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    /// `Ok(None)` on a miss.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
    /// Removes every listed key; absent keys are ignored.
    async fn delete(&self, keys: &[String]) -> Result<(), CacheError>;
    async fn ping(&self) -> Result<(), CacheError>;
}
