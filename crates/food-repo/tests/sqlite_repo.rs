#![cfg(feature = "sqlite")]

use chrono::{Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use food_repo::sqlite::SqliteRepo;
use food_types::domain::business::Address;
use food_types::domain::event::{OrderEvent, OrderEventKind};
use food_types::domain::order::{Order, OrderItem, OrderStatus};
use food_types::domain::page::Pageable;
use food_types::ports::order_repository::{
    OrderFilter, OrderRepository, OutboxRepository, RepoError, SalesFilter,
};
use rust_decimal::Decimal;
use std::path::PathBuf;
use uuid::Uuid;

fn temp_db_url() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut path = PathBuf::from(dir.path());
    path.push(format!("food-{}.db", Uuid::new_v4()));
    let url = format!("sqlite://{}", path.display());
    (dir, url)
}

fn order(client_id: u64) -> Order {
    let address = Address {
        street: "Rua A".into(),
        number: "10".into(),
        city_id: Some(3),
        ..Default::default()
    };
    let mut order = Order::new(
        2,
        client_id,
        1,
        address,
        vec![OrderItem::new(7, "Pizza", 3, Decimal::new(1999, 2))],
    );
    order.set_freight(Decimal::new(750, 2));
    order.compute_totals();
    order.assign_code();
    order
}

#[tokio::test]
async fn sqlite_repo_round_trips_orders() {
    let (_dir, url) = temp_db_url();
    let repo = SqliteRepo::new(&url).await.unwrap();

    let placed = order(5);
    let created = repo.create(placed.clone()).await.unwrap();
    assert!(created.id > 0);

    let fetched = repo.find_by_code(&placed.code).await.unwrap().unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.subtotal, Decimal::new(5997, 2));
    assert_eq!(fetched.total, Decimal::new(6747, 2));
    assert_eq!(fetched.status, OrderStatus::Created);
    assert_eq!(fetched.items, placed.items);
    assert_eq!(fetched.delivery_address.city_id, Some(3));
    assert_eq!(fetched.delivery_address.street, "Rua A");

    let err = repo.create(placed).await.unwrap_err();
    assert!(matches!(err, RepoError::Duplicate(_)));
    assert!(repo.find_by_code("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_search_applies_filters_and_paging() {
    let (_dir, url) = temp_db_url();
    let repo = SqliteRepo::new(&url).await.unwrap();
    let base = Utc.with_ymd_and_hms(2026, 1, 1, 23, 30, 0).unwrap();
    let mut codes = Vec::new();
    for day in 0..4 {
        let mut o = order(if day < 2 { 1 } else { 2 });
        o.created_at = base + Duration::days(day);
        codes.push(o.code.clone());
        repo.create(o).await.unwrap();
    }

    let page = repo.search(&OrderFilter::default(), Pageable::new(0, 3)).await.unwrap();
    assert_eq!(page.total_elements, 4);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.content[0].code, codes[3]);

    let filter = OrderFilter {
        client_id: Some(2),
        created_to: NaiveDate::from_ymd_opt(2026, 1, 3),
        ..Default::default()
    };
    let page = repo.search(&filter, Pageable::default()).await.unwrap();
    assert_eq!(page.total_elements, 1);
    assert_eq!(page.content[0].code, codes[2]);

    let filter = OrderFilter {
        status: Some(OrderStatus::Confirmed),
        ..Default::default()
    };
    assert!(repo.search(&filter, Pageable::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_transition_writes_status_and_outbox_together() {
    let (_dir, url) = temp_db_url();
    let repo = SqliteRepo::new(&url).await.unwrap();
    let created = repo.create(order(1)).await.unwrap();

    let mut confirmed = created.clone();
    confirmed.confirm().unwrap();
    let event = OrderEvent::from_transition(&confirmed).unwrap();
    let now = Utc::now();
    let id = repo
        .transition(&confirmed, OrderStatus::Created, event.clone(), now + Duration::seconds(30))
        .await
        .unwrap();

    let stale = repo
        .transition(
            &confirmed,
            OrderStatus::Created,
            OrderEvent::from_transition(&confirmed).unwrap(),
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(stale, RepoError::Conflict(_)));

    let stored = repo.find_by_code(&created.code).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Confirmed);
    // Stored and published timestamps agree to the microsecond.
    assert_eq!(stored.confirmed_at, confirmed.confirmed_at);
    assert_eq!(stored.confirmed_at, Some(event.transitioned_at));

    // Born claimed by the writer.
    let lease = now + Duration::seconds(60);
    assert!(repo.claim_pending(5, 10, now, lease).await.unwrap().is_empty());

    let later = now + Duration::seconds(31);
    let lease = later + Duration::seconds(30);
    let claimed = repo.claim_pending(5, 10, later, lease).await.unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].id, id);
    assert_eq!(claimed[0].event.kind, OrderEventKind::OrderConfirmed);
    assert_eq!(claimed[0].event.order_code, created.code);
    assert_eq!(claimed[0].claimed_until, Some(lease));
    assert!(repo.claim_pending(5, 10, later, lease).await.unwrap().is_empty());

    repo.record_failure(id, "timeout").await.unwrap();
    repo.record_failure(id, "timeout").await.unwrap();
    assert!(repo.claim_pending(2, 10, later, lease).await.unwrap().is_empty());
    assert_eq!(repo.claim_pending(3, 10, later, lease).await.unwrap()[0].attempts, 2);

    repo.mark_dispatched(id).await.unwrap();
    let much_later = later + Duration::minutes(5);
    assert!(repo
        .claim_pending(5, 10, much_later, much_later)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn sqlite_daily_sales_sum_decimals_per_local_day() {
    let (_dir, url) = temp_db_url();
    let repo = SqliteRepo::new(&url).await.unwrap();
    let base = Utc.with_ymd_and_hms(2026, 2, 1, 22, 0, 0).unwrap();

    for (hours, confirm) in [(0, true), (3, true), (1, false)] {
        let mut placed = order(1);
        placed.created_at = base + Duration::hours(hours);
        let created = repo.create(placed).await.unwrap();
        if confirm {
            let mut confirmed = created.clone();
            confirmed.confirm().unwrap();
            let event = OrderEvent::from_transition(&confirmed).unwrap();
            repo.transition(&confirmed, OrderStatus::Created, event, Utc::now())
                .await
                .unwrap();
        }
    }

    let utc = FixedOffset::east_opt(0).unwrap();
    let days = repo.daily_sales(&SalesFilter::default(), utc).await.unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
    assert_eq!(days[0].total_sales, 1);
    assert_eq!(days[0].total_revenue, Decimal::new(6747, 2));

    let behind = FixedOffset::west_opt(3 * 3600).unwrap();
    let days = repo.daily_sales(&SalesFilter::default(), behind).await.unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0].total_sales, 2);
    assert_eq!(days[0].total_revenue, Decimal::new(13494, 2));

    let other_restaurant = SalesFilter {
        restaurant_id: Some(99),
        ..Default::default()
    };
    assert!(repo.daily_sales(&other_restaurant, utc).await.unwrap().is_empty());

    let until_first = SalesFilter {
        created_to: Some(base),
        ..Default::default()
    };
    let days = repo.daily_sales(&until_first, utc).await.unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0].total_sales, 1);
}
