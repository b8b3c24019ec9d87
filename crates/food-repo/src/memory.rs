use std::cmp::Reverse;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use food_types::domain::event::OrderEvent;
use food_types::domain::order::{Order, OrderStatus};
use food_types::domain::page::{Page, Pageable};
use food_types::domain::sales::DailySales;
use food_types::ports::order_repository::{
    OrderFilter, OrderRepository, OutboxEntry, OutboxRepository, RepoError, SalesFilter,
};

use crate::detached;

#[derive(Clone)]
pub struct InMemoryRepo {
    orders: Arc<DashMap<String, Order>>,
    outbox: Arc<DashMap<u64, OutboxEntry>>,
    order_seq: Arc<AtomicU64>,
    outbox_seq: Arc<AtomicU64>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            orders: Arc::new(DashMap::new()),
            outbox: Arc::new(DashMap::new()),
            order_seq: Arc::new(AtomicU64::new(0)),
            outbox_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Every outbox entry, dispatched or not, oldest first.
    pub fn outbox_entries(&self) -> Vec<OutboxEntry> {
        let mut entries: Vec<OutboxEntry> = self.outbox.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(|e| e.id);
        entries
    }
}

impl Default for InMemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepo {
    async fn create(&self, order: Order) -> Result<Order, RepoError> {
        if order.code.is_empty() {
            return Err(RepoError::DbError("order has no code".into()));
        }
        match self.orders.entry(order.code.clone()) {
            Entry::Occupied(_) => Err(RepoError::Duplicate(format!("order {}", order.code))),
            Entry::Vacant(slot) => {
                let mut order = order;
                order.id = self.order_seq.fetch_add(1, Ordering::SeqCst) + 1;
                slot.insert(detached(&order));
                Ok(order)
            }
        }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Order>, RepoError> {
        Ok(self.orders.get(code).map(|r| r.clone()))
    }

    async fn search(&self, filter: &OrderFilter, page: Pageable) -> Result<Page<Order>, RepoError> {
        let mut matching: Vec<Order> = self
            .orders
            .iter()
            .filter(|kv| filter.matches(kv.value()))
            .map(|kv| kv.value().clone())
            .collect();
        matching.sort_by_key(|o| Reverse((o.created_at, o.id)));

        let total = matching.len() as u64;
        let content = matching
            .into_iter()
            .skip(page.offset())
            .take(page.size as usize)
            .collect();
        Ok(Page::new(content, total, page))
    }

    async fn transition(
        &self,
        order: &Order,
        expected: OrderStatus,
        event: OrderEvent,
        claimed_until: DateTime<Utc>,
    ) -> Result<u64, RepoError> {
        // The shard write lock on the order is held until the outbox row is in.
        let mut stored = self
            .orders
            .get_mut(&order.code)
            .ok_or_else(|| RepoError::Conflict(format!("order {} does not exist", order.code)))?;
        if stored.status != expected {
            return Err(RepoError::Conflict(format!(
                "order {} is {} but {} was expected",
                order.code, stored.status, expected
            )));
        }
        *stored = detached(order);

        let id = self.outbox_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.outbox.insert(
            id,
            OutboxEntry {
                id,
                event,
                attempts: 0,
                last_error: None,
                created_at: Utc::now(),
                dispatched_at: None,
                claimed_until: Some(claimed_until),
            },
        );
        Ok(id)
    }

    async fn daily_sales(
        &self,
        filter: &SalesFilter,
        offset: FixedOffset,
    ) -> Result<Vec<DailySales>, RepoError> {
        let sales: Vec<_> = self
            .orders
            .iter()
            .filter(|kv| filter.matches(kv.value()))
            .map(|kv| (kv.created_at, kv.total))
            .collect();
        Ok(DailySales::tally(sales, offset))
    }
}

#[async_trait]
impl OutboxRepository for InMemoryRepo {
    async fn claim_pending(
        &self,
        max_attempts: u32,
        limit: usize,
        now: DateTime<Utc>,
        claimed_until: DateTime<Utc>,
    ) -> Result<Vec<OutboxEntry>, RepoError> {
        let mut ids: Vec<u64> = self.outbox.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();

        let mut claimed = Vec::new();
        for id in ids {
            if claimed.len() >= limit {
                break;
            }
            // Check and claim under the entry's write guard.
            if let Some(mut entry) = self.outbox.get_mut(&id) {
                if entry.is_claimable(max_attempts, now) {
                    entry.claimed_until = Some(claimed_until);
                    claimed.push(entry.clone());
                }
            }
        }
        Ok(claimed)
    }

    async fn mark_dispatched(&self, id: u64) -> Result<(), RepoError> {
        if let Some(mut entry) = self.outbox.get_mut(&id) {
            entry.dispatched_at = Some(Utc::now());
            entry.claimed_until = None;
        }
        Ok(())
    }

    async fn record_failure(&self, id: u64, error: &str) -> Result<(), RepoError> {
        if let Some(mut entry) = self.outbox.get_mut(&id) {
            entry.attempts += 1;
            entry.last_error = Some(error.to_string());
            entry.claimed_until = None;
        }
        Ok(())
    }
}
