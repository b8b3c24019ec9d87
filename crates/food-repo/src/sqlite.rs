use async_trait::async_trait;
use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, Utc};
use food_types::domain::business::Address;
use food_types::domain::event::OrderEvent;
use food_types::domain::order::{Order, OrderItem, OrderStatus};
use food_types::domain::page::{Page, Pageable};
use food_types::domain::sales::DailySales;
use food_types::ports::order_repository::{
    OrderFilter, OrderRepository, OutboxEntry, OutboxRepository, RepoError, SalesFilter,
};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;

use crate::detached;

const MIGRATIONS: [&str; 2] = [
    include_str!("../migrations/0001_create_orders.sql"),
    include_str!("../migrations/0002_create_order_outbox.sql"),
];

const ORDER_COLUMNS: &str = "id, code, subtotal, freight_fee, total, status, created_at, \
     confirmed_at, cancelled_at, delivered_at, restaurant_id, client_id, payment_method_id, \
     address_json, items_json";

const OUTBOX_COLUMNS: &str =
    "id, payload, attempts, last_error, created_at, dispatched_at, claimed_until";

#[derive(Clone)]
pub struct SqliteRepo {
    pool: SqlitePool,
}

fn db_err(e: impl std::fmt::Display) -> RepoError {
    RepoError::DbError(e.to_string())
}

/// Fixed-width UTC text so lexical order matches time order.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn day_start(day: NaiveDate) -> String {
    timestamp(day.and_time(NaiveTime::MIN).and_utc())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepoError> {
    Ok(DateTime::parse_from_rfc3339(raw).map_err(db_err)?.with_timezone(&Utc))
}

fn parse_optional(raw: Option<String>) -> Result<Option<DateTime<Utc>>, RepoError> {
    raw.as_deref().map(parse_timestamp).transpose()
}

fn parse_decimal(raw: &str) -> Result<Decimal, RepoError> {
    Decimal::from_str(raw).map_err(db_err)
}

#[derive(FromRow)]
struct DbOrder {
    id: i64,
    code: String,
    subtotal: String,
    freight_fee: String,
    total: String,
    status: String,
    created_at: String,
    confirmed_at: Option<String>,
    cancelled_at: Option<String>,
    delivered_at: Option<String>,
    restaurant_id: i64,
    client_id: i64,
    payment_method_id: i64,
    address_json: String,
    items_json: String,
}

impl DbOrder {
    fn into_order(self) -> Result<Order, RepoError> {
        let status = OrderStatus::from_str(&self.status).map_err(db_err)?;
        let items: Vec<OrderItem> = serde_json::from_str(&self.items_json).map_err(db_err)?;
        let delivery_address: Address = serde_json::from_str(&self.address_json).map_err(db_err)?;
        Ok(Order {
            id: self.id as u64,
            code: self.code,
            subtotal: parse_decimal(&self.subtotal)?,
            freight_fee: parse_decimal(&self.freight_fee)?,
            total: parse_decimal(&self.total)?,
            status,
            created_at: parse_timestamp(&self.created_at)?,
            confirmed_at: parse_optional(self.confirmed_at)?,
            cancelled_at: parse_optional(self.cancelled_at)?,
            delivered_at: parse_optional(self.delivered_at)?,
            restaurant_id: self.restaurant_id as u64,
            restaurant: None,
            client_id: self.client_id as u64,
            client: None,
            payment_method_id: self.payment_method_id as u64,
            payment_method: None,
            delivery_address,
            items,
        })
    }
}

#[derive(FromRow)]
struct DbOutbox {
    id: i64,
    payload: String,
    attempts: i64,
    last_error: Option<String>,
    created_at: String,
    dispatched_at: Option<String>,
    claimed_until: Option<String>,
}

impl DbOutbox {
    fn into_entry(self) -> Result<OutboxEntry, RepoError> {
        Ok(OutboxEntry {
            id: self.id as u64,
            event: serde_json::from_str(&self.payload).map_err(db_err)?,
            attempts: self.attempts as u32,
            last_error: self.last_error,
            created_at: parse_timestamp(&self.created_at)?,
            dispatched_at: parse_optional(self.dispatched_at)?,
            claimed_until: parse_optional(self.claimed_until)?,
        })
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &OrderFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(client_id) = filter.client_id {
        qb.push(" AND client_id = ").push_bind(client_id as i64);
    }
    if let Some(restaurant_id) = filter.restaurant_id {
        qb.push(" AND restaurant_id = ").push_bind(restaurant_id as i64);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(from) = filter.created_from {
        qb.push(" AND created_at >= ").push_bind(day_start(from));
    }
    if let Some(to) = filter.created_to {
        let next_day = to.checked_add_days(Days::new(1)).unwrap_or(to);
        qb.push(" AND created_at < ").push_bind(day_start(next_day));
    }
}

impl SqliteRepo {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let in_memory = database_url.contains(":memory:");
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            if !in_memory {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Each in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .connect_with(options)
            .await?;

        for ddl in MIGRATIONS {
            sqlx::query(ddl).execute(&pool).await?;
        }
        tracing::debug!(url = database_url, "sqlite migrations applied");

        Ok(Self { pool })
    }
}

#[async_trait]
impl OrderRepository for SqliteRepo {
    async fn create(&self, order: Order) -> Result<Order, RepoError> {
        if order.code.is_empty() {
            return Err(RepoError::DbError("order has no code".into()));
        }
        let stored = detached(&order);
        let items_json = serde_json::to_string(&stored.items).map_err(db_err)?;
        let address_json = serde_json::to_string(&stored.delivery_address).map_err(db_err)?;
        let res = sqlx::query(
            "INSERT INTO orders (code, subtotal, freight_fee, total, status, created_at, confirmed_at,
             cancelled_at, delivered_at, restaurant_id, client_id, payment_method_id, address_json, items_json)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&order.code)
        .bind(order.subtotal.to_string())
        .bind(order.freight_fee.to_string())
        .bind(order.total.to_string())
        .bind(order.status.as_str())
        .bind(timestamp(order.created_at))
        .bind(order.confirmed_at.map(timestamp))
        .bind(order.cancelled_at.map(timestamp))
        .bind(order.delivered_at.map(timestamp))
        .bind(order.restaurant_id as i64)
        .bind(order.client_id as i64)
        .bind(order.payment_method_id as i64)
        .bind(address_json)
        .bind(items_json)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Duplicate(format!("order {}", order.code))
            }
            other => db_err(other),
        })?;

        let mut order = order;
        order.id = res.last_insert_rowid() as u64;
        Ok(order)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Order>, RepoError> {
        let row: Option<DbOrder> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE code = ?"))
                .bind(code)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(|r| r.into_order()).transpose()
    }

    async fn search(&self, filter: &OrderFilter, page: Pageable) -> Result<Page<Order>, RepoError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM orders");
        push_filters(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        push_filters(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.size as i64)
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
        let rows: Vec<DbOrder> = select
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let content = rows
            .into_iter()
            .map(|r| r.into_order())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(content, total as u64, page))
    }

    async fn transition(
        &self,
        order: &Order,
        expected: OrderStatus,
        event: OrderEvent,
        claimed_until: DateTime<Utc>,
    ) -> Result<u64, RepoError> {
        let payload = serde_json::to_string(&event).map_err(db_err)?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let updated = sqlx::query(
            "UPDATE orders SET status = ?, confirmed_at = ?, cancelled_at = ?, delivered_at = ?
             WHERE code = ? AND status = ?",
        )
        .bind(order.status.as_str())
        .bind(order.confirmed_at.map(timestamp))
        .bind(order.cancelled_at.map(timestamp))
        .bind(order.delivered_at.map(timestamp))
        .bind(&order.code)
        .bind(expected.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(db_err)?;
            return Err(RepoError::Conflict(format!(
                "order {} is no longer {}",
                order.code, expected
            )));
        }

        let inserted = sqlx::query(
            "INSERT INTO order_outbox (order_code, event_type, payload, attempts, created_at, claimed_until)
             VALUES (?, ?, ?, 0, ?, ?)",
        )
        .bind(&order.code)
        .bind(event.event_type())
        .bind(payload)
        .bind(timestamp(Utc::now()))
        .bind(timestamp(claimed_until))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(inserted.last_insert_rowid() as u64)
    }

    async fn daily_sales(
        &self,
        filter: &SalesFilter,
        offset: FixedOffset,
    ) -> Result<Vec<DailySales>, RepoError> {
        let mut select =
            QueryBuilder::<Sqlite>::new("SELECT created_at, total FROM orders WHERE status IN (");
        select
            .push_bind(OrderStatus::Confirmed.as_str())
            .push(", ")
            .push_bind(OrderStatus::Delivered.as_str())
            .push(")");
        if let Some(restaurant_id) = filter.restaurant_id {
            select.push(" AND restaurant_id = ").push_bind(restaurant_id as i64);
        }
        if let Some(from) = filter.created_from {
            select.push(" AND created_at >= ").push_bind(timestamp(from));
        }
        if let Some(to) = filter.created_to {
            select.push(" AND created_at <= ").push_bind(timestamp(to));
        }
        let rows: Vec<(String, String)> = select
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        // Totals are summed as decimals, not as SQLite floats.
        let sales = rows
            .iter()
            .map(|(created_at, total)| Ok((parse_timestamp(created_at)?, parse_decimal(total)?)))
            .collect::<Result<Vec<_>, RepoError>>()?;
        Ok(DailySales::tally(sales, offset))
    }
}

#[async_trait]
impl OutboxRepository for SqliteRepo {
    async fn claim_pending(
        &self,
        max_attempts: u32,
        limit: usize,
        now: DateTime<Utc>,
        claimed_until: DateTime<Utc>,
    ) -> Result<Vec<OutboxEntry>, RepoError> {
        // One statement, so concurrent dispatchers never claim the same row.
        let rows: Vec<DbOutbox> = sqlx::query_as(&format!(
            "UPDATE order_outbox SET claimed_until = ?
             WHERE id IN (
                 SELECT id FROM order_outbox
                 WHERE dispatched_at IS NULL AND attempts < ?
                   AND (claimed_until IS NULL OR claimed_until <= ?)
                 ORDER BY id LIMIT ?
             )
             RETURNING {OUTBOX_COLUMNS}"
        ))
        .bind(timestamp(claimed_until))
        .bind(i64::from(max_attempts))
        .bind(timestamp(now))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut entries = rows
            .into_iter()
            .map(|r| r.into_entry())
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|e| e.id);
        Ok(entries)
    }

    async fn mark_dispatched(&self, id: u64) -> Result<(), RepoError> {
        sqlx::query("UPDATE order_outbox SET dispatched_at = ?, claimed_until = NULL WHERE id = ?")
            .bind(timestamp(Utc::now()))
            .bind(id as i64)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn record_failure(&self, id: u64, error: &str) -> Result<(), RepoError> {
        sqlx::query(
            "UPDATE order_outbox SET attempts = attempts + 1, last_error = ?, claimed_until = NULL
             WHERE id = ?",
        )
        .bind(error)
        .bind(id as i64)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
