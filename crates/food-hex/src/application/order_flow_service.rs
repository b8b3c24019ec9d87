use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use food_types::domain::event::OrderEvent;
use food_types::domain::order::{Order, OrderStatus};
use food_types::ports::event_publisher::EventPublisher;
use food_types::ports::order_repository::{OrderRepository, OutboxRepository, RepoError};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::order_service::OrderService;
use super::outbox::{lease_end, DEFAULT_CLAIM_LEASE};
use crate::errors::AppError;

/// Keyed async mutex: one in-flight transition per order code.
#[derive(Clone, Default)]
pub struct OrderLocks {
    inner: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

pub struct OrderLockGuard {
    locks: OrderLocks,
    code: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, code: &str) -> OrderLockGuard {
        let mutex = self
            .inner
            .entry(code.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        OrderLockGuard {
            locks: self.clone(),
            code: code.to_string(),
            guard: Some(guard),
        }
    }

    /// Codes that currently have a lock entry.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Drop for OrderLockGuard {
    fn drop(&mut self) {
        self.guard.take();
        // Only the map still holds the mutex once nobody waits on it.
        self.locks
            .inner
            .remove_if(&self.code, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

pub struct OrderFlowService {
    orders: Arc<OrderService>,
    repo: Arc<dyn OrderRepository>,
    outbox: Arc<dyn OutboxRepository>,
    publisher: Arc<dyn EventPublisher>,
    locks: OrderLocks,
    claim_lease: Duration,
}

impl OrderFlowService {
    pub fn new(
        orders: Arc<OrderService>,
        repo: Arc<dyn OrderRepository>,
        outbox: Arc<dyn OutboxRepository>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            orders,
            repo,
            outbox,
            publisher,
            locks: OrderLocks::new(),
            claim_lease: DEFAULT_CLAIM_LEASE,
        }
    }

    pub fn locks(&self) -> &OrderLocks {
        &self.locks
    }

    pub async fn confirm(&self, code: &str) -> Result<Order, AppError> {
        self.transition(code, OrderStatus::Confirmed).await
    }

    pub async fn cancel(&self, code: &str) -> Result<Order, AppError> {
        self.transition(code, OrderStatus::Cancelled).await
    }

    pub async fn deliver(&self, code: &str) -> Result<Order, AppError> {
        self.transition(code, OrderStatus::Delivered).await
    }

    async fn transition(&self, code: &str, target: OrderStatus) -> Result<Order, AppError> {
        let lock = self.locks.acquire(code).await;

        let mut order = self.orders.find_by_code(code).await?;
        let previous = order.status;
        match target {
            OrderStatus::Confirmed => order.confirm()?,
            OrderStatus::Cancelled => order.cancel()?,
            OrderStatus::Delivered => order.deliver()?,
            OrderStatus::Created => {
                return Err(AppError::BusinessRule(format!(
                    "order {code} cannot move back to {target}"
                )))
            }
        }

        let event = OrderEvent::from_transition(&order)
            .ok_or_else(|| anyhow::anyhow!("no event for transition to {target}"))?;
        let claimed_until = lease_end(Utc::now(), self.claim_lease);
        let outbox_id = self
            .repo
            .transition(&order, previous, event.clone(), claimed_until)
            .await
            .map_err(|e| match e {
                RepoError::Conflict(_) => AppError::BusinessRule(format!(
                    "order {code} changed status concurrently; it is no longer {previous}"
                )),
                other => other.into(),
            })?;
        drop(lock);

        tracing::info!(
            order_code = code,
            from = %previous,
            to = %order.status,
            outbox_id,
            "order status changed"
        );
        self.publish_now(outbox_id, &event).await;
        Ok(order)
    }

    /// Single delivery attempt under the claim taken at write time. Failures
    /// release the claim and stay on the entry for the dispatcher.
    async fn publish_now(&self, outbox_id: u64, event: &OrderEvent) {
        match self.publisher.publish(event).await {
            Ok(()) => {
                if let Err(e) = self.outbox.mark_dispatched(outbox_id).await {
                    tracing::warn!(outbox_id, error = %e, "could not mark event dispatched");
                }
            }
            Err(e) => {
                tracing::warn!(
                    outbox_id,
                    event_type = event.event_type(),
                    order_code = %event.order_code,
                    error = %e,
                    "event publish failed, left for retry"
                );
                if let Err(e) = self.outbox.record_failure(outbox_id, &e.to_string()).await {
                    tracing::warn!(outbox_id, error = %e, "could not record publish failure");
                }
            }
        }
    }
}
