use std::sync::Arc;
use std::time::Duration;

use food_types::ports::cache::{CacheBackend, CacheError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::timeout;

/// Bounded-latency front for a [`CacheBackend`].
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    timeout: Duration,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Any failure is reported as a miss.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        match timeout(self.timeout, self.backend.get(key)).await {
            Ok(Ok(hit)) => {
                tracing::debug!(key, hit = hit.is_some(), "cache lookup");
                hit
            }
            Ok(Err(e)) => {
                tracing::warn!(key, error = %e, "cache read failed, treating as miss");
                None
            }
            Err(_) => {
                tracing::warn!(
                    key,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "cache read timed out, treating as miss"
                );
                None
            }
        }
    }

    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        timeout(self.timeout, self.backend.set(key, value, ttl))
            .await
            .map_err(|_| CacheError::Timeout(self.timeout))?
    }

    pub async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        timeout(self.timeout, self.backend.delete(keys))
            .await
            .map_err(|_| CacheError::Timeout(self.timeout))?
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        timeout(self.timeout, self.backend.ping())
            .await
            .map_err(|_| CacheError::Timeout(self.timeout))?
    }

    /// Undecodable payloads count as misses.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.get(key).await?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "cached payload could not be decoded, treating as miss");
                None
            }
        }
    }

    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(value).map_err(|e| CacheError::Codec(e.to_string()))?;
        self.set(key, bytes, ttl).await
    }
}
