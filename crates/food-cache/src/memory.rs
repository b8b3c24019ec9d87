use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use food_types::ports::cache::{CacheBackend, CacheError};
use tokio::time::Instant;

#[derive(Clone)]
struct Slot {
    value: Vec<u8>,
    expires_at: Instant,
}

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Process-local cache with per-key expiry. Expired keys are dropped on read,
/// and writes sweep out expired keys nobody reads at most once per sweep interval.
#[derive(Clone)]
pub struct MemoryCache {
    map: Arc<DashMap<String, Slot>>,
    epoch: Instant,
    sweep_interval: Duration,
    // Milliseconds since `epoch` at which the next write sweeps.
    next_sweep_ms: Arc<AtomicU64>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self {
            map: Arc::new(DashMap::new()),
            epoch: Instant::now(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            next_sweep_ms: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// One writer per interval wins the sweep; the rest skip it.
    fn sweep_if_due(&self, now: Instant) {
        let elapsed = now.duration_since(self.epoch).as_millis() as u64;
        let due = self.next_sweep_ms.load(Ordering::Acquire);
        if elapsed < due {
            return;
        }
        let next = elapsed.saturating_add(self.sweep_interval.as_millis() as u64);
        if self
            .next_sweep_ms
            .compare_exchange(due, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let before = self.map.len();
            self.map.retain(|_, slot| slot.expires_at > now);
            tracing::trace!(swept = before.saturating_sub(self.map.len()), "memory cache sweep");
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        if let Some(slot) = self.map.get(key) {
            if slot.expires_at > now {
                return Ok(Some(slot.value.clone()));
            }
        }
        self.map.remove_if(key, |_, slot| slot.expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        self.sweep_if_due(now);
        self.map.insert(
            key.to_string(),
            Slot {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        for key in keys {
            self.map.remove(key);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
