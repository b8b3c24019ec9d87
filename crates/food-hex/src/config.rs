use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: String,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub cache_timeout_ms: u64,
    pub event_webhook_url: Option<String>,
    pub outbox_poll_interval_ms: u64,
    pub outbox_max_attempts: u32,
    pub outbox_batch_size: usize,
    pub seed_demo_data: bool,
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let server_port = env::var("SERVER_PORT").unwrap_or_else(|_| "3000".into());
        Ok(Self {
            server_port,
            database_url: optional("DATABASE_URL"),
            redis_url: optional("REDIS_URL"),
            cache_timeout_ms: parsed("CACHE_TIMEOUT_MS", 100)?,
            event_webhook_url: optional("EVENT_WEBHOOK_URL"),
            outbox_poll_interval_ms: parsed("OUTBOX_POLL_INTERVAL_MS", 1000)?,
            outbox_max_attempts: parsed("OUTBOX_MAX_ATTEMPTS", 5)?,
            outbox_batch_size: parsed("OUTBOX_BATCH_SIZE", 50)?,
            seed_demo_data: parsed("SEED_DEMO_DATA", false)?,
        })
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }

    pub fn outbox_poll_interval(&self) -> Duration {
        Duration::from_millis(self.outbox_poll_interval_ms)
    }
}
