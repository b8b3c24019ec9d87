#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a repo feature: `memory` or `sqlite`.");

use chrono::{DateTime, FixedOffset, Utc};
use food_types::domain::event::OrderEvent;
use food_types::domain::order::{Order, OrderStatus};
use food_types::domain::page::{Page, Pageable};
use food_types::domain::sales::DailySales;
use food_types::ports::order_repository::{
    OrderFilter, OrderRepository, OutboxEntry, OutboxRepository, RepoError, SalesFilter,
};

pub mod catalog;
pub mod seed;
#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use catalog::MemoryCatalog;
pub use seed::{seed_demo_data, DemoCatalog};

/// Order store selected at startup from the enabled features.
#[derive(Clone)]
pub enum Repo {
    #[cfg(feature = "memory")]
    Memory(memory::InMemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteRepo),
}

pub async fn build_repo(url: Option<&str>) -> anyhow::Result<Repo> {
    Repo::build_repo(url).await
}

impl Repo {
    #[cfg(all(feature = "memory", not(feature = "sqlite")))]
    pub async fn build_repo(_: Option<&str>) -> anyhow::Result<Self> {
        Ok(Self::Memory(memory::InMemoryRepo::new()))
    }

    #[cfg(all(feature = "sqlite", not(feature = "memory")))]
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        let url = database_url.unwrap_or("sqlite://food.db");
        Ok(Self::Sqlite(sqlite::SqliteRepo::new(url).await?))
    }

    // With both features a configured URL picks SQLite.
    #[cfg(all(feature = "sqlite", feature = "memory"))]
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        match database_url {
            Some(url) => Ok(Self::Sqlite(sqlite::SqliteRepo::new(url).await?)),
            None => Ok(Self::Memory(memory::InMemoryRepo::new())),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(_) => "memory",
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(_) => "sqlite",
        }
    }
}

#[async_trait::async_trait]
impl OrderRepository for Repo {
    async fn create(&self, order: Order) -> Result<Order, RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(repo) => repo.create(order).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(repo) => repo.create(order).await,
        }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Order>, RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(repo) => repo.find_by_code(code).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(repo) => repo.find_by_code(code).await,
        }
    }

    async fn search(&self, filter: &OrderFilter, page: Pageable) -> Result<Page<Order>, RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(repo) => repo.search(filter, page).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(repo) => repo.search(filter, page).await,
        }
    }

    async fn transition(
        &self,
        order: &Order,
        expected: OrderStatus,
        event: OrderEvent,
        claimed_until: DateTime<Utc>,
    ) -> Result<u64, RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(repo) => repo.transition(order, expected, event, claimed_until).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(repo) => repo.transition(order, expected, event, claimed_until).await,
        }
    }

    async fn daily_sales(
        &self,
        filter: &SalesFilter,
        offset: FixedOffset,
    ) -> Result<Vec<DailySales>, RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(repo) => repo.daily_sales(filter, offset).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(repo) => repo.daily_sales(filter, offset).await,
        }
    }
}

#[async_trait::async_trait]
impl OutboxRepository for Repo {
    async fn claim_pending(
        &self,
        max_attempts: u32,
        limit: usize,
        now: DateTime<Utc>,
        claimed_until: DateTime<Utc>,
    ) -> Result<Vec<OutboxEntry>, RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(repo) => repo.claim_pending(max_attempts, limit, now, claimed_until).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(repo) => repo.claim_pending(max_attempts, limit, now, claimed_until).await,
        }
    }

    async fn mark_dispatched(&self, id: u64) -> Result<(), RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(repo) => repo.mark_dispatched(id).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(repo) => repo.mark_dispatched(id).await,
        }
    }

    async fn record_failure(&self, id: u64, error: &str) -> Result<(), RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(repo) => repo.record_failure(id, error).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(repo) => repo.record_failure(id, error).await,
        }
    }
}

/// Strips the read-side associations so only foreign keys are stored.
pub(crate) fn detached(order: &Order) -> Order {
    let mut stored = order.clone();
    stored.restaurant = None;
    stored.client = None;
    stored.payment_method = None;
    stored.delivery_address.city = None;
    stored
}
