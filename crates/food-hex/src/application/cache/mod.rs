//! Cache-aside layer. The cache is a side channel: reads fall back to the
//! store on any failure and writes to it are best-effort.

use std::time::Duration;

use food_types::ports::cache::CacheError;

pub mod business;
pub mod location;
pub mod store;
pub mod user;

pub use business::BusinessCache;
pub use location::LocationCache;
pub use store::CacheStore;
pub use user::UserCache;

pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct CacheTtls {
    pub location: Duration,
    pub restaurant: Duration,
    pub cuisine: Duration,
    pub payment_method: Duration,
    pub user: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            location: Duration::from_secs(30 * 60),
            restaurant: Duration::from_secs(10 * 60),
            cuisine: Duration::from_secs(30 * 60),
            payment_method: Duration::from_secs(30 * 60),
            user: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Upper bound for every single cache operation.
    pub timeout: Duration,
    pub ttls: CacheTtls,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CACHE_TIMEOUT,
            ttls: CacheTtls::default(),
        }
    }
}

/// Logs a failed cache write or invalidation and moves on.
pub(crate) fn ignore_failure(action: &str, result: Result<(), CacheError>) {
    if let Err(e) = result {
        tracing::warn!(action, error = %e, "cache write failed, continuing without it");
    }
}
