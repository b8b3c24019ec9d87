use async_trait::async_trait;

use crate::domain::event::OrderEvent;

#[derive(thiserror::Error, Debug)]
#[error("failed to publish {event_type}: {reason}")]
pub struct PublishError {
    pub event_type: &'static str,
    pub reason: String,
}

/// Hands a finished event to downstream delivery. One attempt per call.
#[async_trait]
pub trait EventPublisher: Send + Sync + 'static {
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError>;
}
