use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::event::OrderEvent;
use crate::domain::order::{Order, OrderStatus};
use crate::domain::page::{Page, Pageable};
use crate::domain::sales::DailySales;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("db error: {0}")]
    DbError(String),

    #[error("{0} is still referenced")]
    InUse(String),

    /// A guarded write found the row in a different state than expected.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("duplicate: {0}")]
    Duplicate(String),
}

/// Search criteria for orders; every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderFilter {
    pub client_id: Option<u64>,
    pub restaurant_id: Option<u64>,
    pub status: Option<OrderStatus>,
    /// Inclusive lower bound on the creation day (UTC).
    pub created_from: Option<NaiveDate>,
    /// Inclusive upper bound on the creation day (UTC).
    pub created_to: Option<NaiveDate>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        let day = order.created_at.date_naive();
        self.client_id.map_or(true, |id| order.client_id == id)
            && self.restaurant_id.map_or(true, |id| order.restaurant_id == id)
            && self.status.map_or(true, |s| order.status == s)
            && self.created_from.map_or(true, |from| day >= from)
            && self.created_to.map_or(true, |to| day <= to)
    }
}

/// Criteria for the daily sales report. Bounds are inclusive instants.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SalesFilter {
    pub restaurant_id: Option<u64>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl SalesFilter {
    /// Only confirmed and delivered orders count as sales.
    pub fn matches(&self, order: &Order) -> bool {
        order.status.is_sale()
            && self.restaurant_id.map_or(true, |id| order.restaurant_id == id)
            && self.created_from.map_or(true, |from| order.created_at >= from)
            && self.created_to.map_or(true, |to| order.created_at <= to)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutboxEntry {
    pub id: u64,
    pub event: OrderEvent,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
    /// Whoever holds the entry publishes it; nobody else may until this passes.
    #[serde(default)]
    pub claimed_until: Option<DateTime<Utc>>,
}

impl OutboxEntry {
    pub fn is_claimable(&self, max_attempts: u32, now: DateTime<Utc>) -> bool {
        self.dispatched_at.is_none()
            && self.attempts < max_attempts
            && self.claimed_until.map_or(true, |until| until <= now)
    }
}

#[async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    /// Inserts a new order and returns it with its store id.
    async fn create(&self, order: Order) -> Result<Order, RepoError>;
    async fn find_by_code(&self, code: &str) -> Result<Option<Order>, RepoError>;
    /// Newest first.
    async fn search(&self, filter: &OrderFilter, page: Pageable) -> Result<Page<Order>, RepoError>;
    /// Persists a lifecycle change together with its outbox entry in one write.
    /// The entry is born claimed by the caller until `claimed_until`.
    ///
    /// Fails with [`RepoError::Conflict`] when the stored status is no longer
    /// `expected`; nothing is written in that case. Returns the outbox entry id.
    async fn transition(
        &self,
        order: &Order,
        expected: OrderStatus,
        event: OrderEvent,
        claimed_until: DateTime<Utc>,
    ) -> Result<u64, RepoError>;
    /// Sales per creation day as seen in `offset`, oldest day first.
    async fn daily_sales(
        &self,
        filter: &SalesFilter,
        offset: FixedOffset,
    ) -> Result<Vec<DailySales>, RepoError>;
}

#[async_trait]
pub trait OutboxRepository: Send + Sync + 'static {
    /// Atomically claims up to `limit` entries that are claimable at `now`
    /// (see [`OutboxEntry::is_claimable`]) and holds them until
    /// `claimed_until`. Oldest first. A claimed entry is returned to one caller only.
    async fn claim_pending(
        &self,
        max_attempts: u32,
        limit: usize,
        now: DateTime<Utc>,
        claimed_until: DateTime<Utc>,
    ) -> Result<Vec<OutboxEntry>, RepoError>;
    async fn mark_dispatched(&self, id: u64) -> Result<(), RepoError>;
    /// Counts a failed attempt and releases the claim.
    async fn record_failure(&self, id: u64, error: &str) -> Result<(), RepoError>;
}
