//! Cache backends behind [`CacheBackend`]. The application treats every
//! backend as optional: failures surface as errors here and are turned into
//! misses by the caller.

use std::sync::Arc;

use food_types::ports::cache::CacheBackend;

pub mod disabled;
#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_cache;

pub use disabled::DisabledCache;

/// Picks a backend for `url`. An unreachable Redis degrades to [`DisabledCache`]
/// so the service keeps answering from the store.
pub async fn build_cache(url: Option<&str>) -> Arc<dyn CacheBackend> {
    match url {
        #[cfg(feature = "redis")]
        Some(url) => match redis_cache::RedisCache::connect(url).await {
            Ok(cache) => {
                tracing::info!(backend = "redis", "cache connected");
                Arc::new(cache)
            }
            Err(e) => {
                tracing::warn!(error = %e, "cache unreachable, continuing without it");
                Arc::new(DisabledCache)
            }
        },
        #[cfg(not(feature = "redis"))]
        Some(_) => {
            tracing::warn!("REDIS_URL set but the `redis` feature is off; cache disabled");
            Arc::new(DisabledCache)
        }
        None => default_backend(),
    }
}

#[cfg(feature = "memory")]
fn default_backend() -> Arc<dyn CacheBackend> {
    tracing::info!(backend = "memory", "using in-process cache");
    Arc::new(memory::MemoryCache::new())
}

#[cfg(not(feature = "memory"))]
fn default_backend() -> Arc<dyn CacheBackend> {
    tracing::info!("no cache configured");
    Arc::new(DisabledCache)
}
