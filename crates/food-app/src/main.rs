use std::sync::Arc;

use food_cache::build_cache;
use food_hex::application::cache::CacheSettings;
use food_hex::application::outbox::OutboxSettings;
use food_hex::application::{Repositories, Services};
use food_hex::config::Config;
use food_hex::inbound::http::{HttpServer, HttpServerConfig};
use food_hex::outbound::{LoggingPublisher, WebhookPublisher};
use food_repo::{build_repo, seed_demo_data, MemoryCatalog, Repo};
use food_types::ports::event_publisher::EventPublisher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for DATABASE_URL / REDIS_URL / SERVER_PORT when present.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string()))
        .init();

    let config = Config::from_env()?;
    let repo: Repo = build_repo(config.database_url.as_deref()).await?;
    tracing::info!(backend = repo.backend_name(), "order store ready");

    let catalog = MemoryCatalog::new();
    if config.seed_demo_data {
        seed_demo_data(&catalog).await?;
    }

    let cache = build_cache(config.redis_url.as_deref()).await;
    let publisher: Arc<dyn EventPublisher> = match config.event_webhook_url.as_deref() {
        Some(url) => {
            tracing::info!(url, "publishing order events to webhook");
            Arc::new(WebhookPublisher::new(url)?)
        }
        None => Arc::new(LoggingPublisher),
    };

    let settings = CacheSettings {
        timeout: config.cache_timeout(),
        ..CacheSettings::default()
    };
    let services = Services::build(
        Repositories::from_stores(catalog, repo),
        cache,
        settings,
        publisher,
    );
    match services.warm_up_locations().await {
        Ok((states, cities)) => tracing::info!(states, cities, "location cache warmed"),
        Err(e) => tracing::warn!(error = %e, "location warm-up skipped"),
    }

    let dispatcher = services.dispatcher(OutboxSettings {
        poll_interval: config.outbox_poll_interval(),
        max_attempts: config.outbox_max_attempts,
        batch_size: config.outbox_batch_size,
        ..OutboxSettings::default()
    });
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let dispatcher_task = tokio::spawn(dispatcher.run(async {
        let _ = stopped.await;
    }));

    let server_cfg = HttpServerConfig {
        port: config.server_port.clone(),
    };
    let http = HttpServer::new(services, server_cfg).await?;
    http.run_until(shutdown_signal()).await?;

    let _ = stop.send(());
    dispatcher_task.await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
