use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use food_types::domain::event::OrderEvent;
use food_types::ports::event_publisher::{EventPublisher, PublishError};
use reqwest::Url;

/// Writes each event to the log. Used when no webhook is configured.
#[derive(Clone, Default)]
pub struct LoggingPublisher;

#[async_trait]
impl EventPublisher for LoggingPublisher {
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError> {
        tracing::info!(
            event_type = event.event_type(),
            order_code = %event.order_code,
            client_email = %event.client_email,
            restaurant = %event.restaurant_name,
            total = %event.total,
            "order event"
        );
        Ok(())
    }
}

/// POSTs the event as JSON; any non-2xx answer counts as a failed attempt.
#[derive(Clone)]
pub struct WebhookPublisher {
    url: Url,
    client: reqwest::Client,
}

impl WebhookPublisher {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(url: &str) -> anyhow::Result<Self> {
        Self::with_timeout(url, Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let url = Url::parse(url).context("invalid webhook url")?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { url, client })
    }
}

#[async_trait]
impl EventPublisher for WebhookPublisher {
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError> {
        let failed = |reason: String| PublishError {
            event_type: event.event_type(),
            reason,
        };
        let res = self
            .client
            .post(self.url.clone())
            .header("x-event-type", event.event_type())
            .json(event)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !res.status().is_success() {
            return Err(failed(format!("webhook answered {}", res.status())));
        }
        Ok(())
    }
}
