mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, Utc};
use common::{demo_order, fixture, fixture_with};
use food_cache::memory::MemoryCache;
use food_hex::application::cache::{CacheSettings, CacheTtls};
use food_hex::application::outbox::{DispatchReport, OutboxSettings};
use food_hex::application::Services;
use food_hex::errors::AppError;
use food_types::domain::business::{Product, Restaurant};
use food_types::domain::event::OrderEventKind;
use food_types::domain::location::State;
use food_types::domain::order::OrderStatus;
use food_types::domain::page::Pageable;
use food_types::ports::cache::CacheBackend;
use food_types::ports::catalog_repository::StateRepository;
use food_types::ports::order_repository::{OrderFilter, SalesFilter};
use rust_decimal::Decimal;

// End-to-end service flow against the in-memory adapters.
#[tokio::test]
async fn placing_an_order_snapshots_prices_and_totals() {
    let fx = fixture().await;

    let order = fx.services.orders.emit(demo_order(&fx.demo)).await.unwrap();
    assert_eq!(order.subtotal, Decimal::new(2300, 2));
    assert_eq!(order.freight_fee, Decimal::new(500, 2));
    assert_eq!(order.total, Decimal::new(2800, 2));
    assert_eq!(order.status, OrderStatus::Created);
    assert!(!order.code.is_empty());
    assert_eq!(order.items[0].product_name, "Pad Thai");
    assert_eq!(order.items[0].total_price, Decimal::new(2000, 2));
    assert_eq!(order.items[0].note.as_deref(), Some("no peanuts"));

    let fetched = fx.services.orders.find_by_code(&order.code).await.unwrap();
    assert_eq!(fetched.total, order.total);
    assert_eq!(fetched.restaurant.unwrap().name, "Thai Gourmet");
    assert_eq!(fetched.client.unwrap().email, "ana@food.dev");
    assert_eq!(fetched.payment_method.unwrap().id, fx.demo.card_id);
    assert_eq!(
        fetched.delivery_address.city.map(|c| c.name).as_deref(),
        Some("Campinas")
    );
}

#[tokio::test]
async fn rejected_orders_are_never_persisted() {
    let fx = fixture().await;

    let mut cash = demo_order(&fx.demo);
    cash.payment_method_id = fx.demo.cash_id;
    let err = fx.services.orders.emit(cash).await.unwrap_err();
    assert!(matches!(err, AppError::BusinessRule(_)), "{err:?}");

    let mut empty = demo_order(&fx.demo);
    empty.items.clear();
    assert!(matches!(
        fx.services.orders.emit(empty).await,
        Err(AppError::BusinessRule(_))
    ));

    let mut zero = demo_order(&fx.demo);
    zero.items[0].quantity = 0;
    assert!(matches!(
        fx.services.orders.emit(zero).await,
        Err(AppError::BusinessRule(_))
    ));

    let mut unknown_product = demo_order(&fx.demo);
    unknown_product.items[0].product_id = 999;
    assert!(matches!(
        fx.services.orders.emit(unknown_product).await,
        Err(AppError::NotFound { entity: "product", .. })
    ));

    // A real product, sold by another restaurant.
    let demo_restaurant = fx.services.restaurants.find_by_id(fx.demo.restaurant_id).await.unwrap();
    let other = fx
        .services
        .restaurants
        .save(Restaurant::new("Sushi Bar", Decimal::new(800, 2), demo_restaurant.cuisine))
        .await
        .unwrap();
    let sushi = fx
        .services
        .products
        .save(
            other.id,
            Product {
                id: 0,
                restaurant_id: 0,
                name: "Temaki".into(),
                description: String::new(),
                price: Decimal::new(2500, 2),
                active: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(
        fx.services.products.find_by_id(other.id, sushi.id).await.unwrap().name,
        "Temaki"
    );
    let mut foreign_product = demo_order(&fx.demo);
    foreign_product.items[0].product_id = sushi.id;
    assert!(matches!(
        fx.services.orders.emit(foreign_product).await,
        Err(AppError::NotFound { entity: "product", .. })
    ));

    let mut unknown_client = demo_order(&fx.demo);
    unknown_client.client_id = 999;
    assert!(matches!(
        fx.services.orders.emit(unknown_client).await,
        Err(AppError::NotFound { entity: "user", .. })
    ));

    let page = fx
        .services
        .orders
        .search(&OrderFilter::default(), Pageable::default())
        .await
        .unwrap();
    assert_eq!(page.total_elements, 0);
}

#[tokio::test]
async fn later_price_and_freight_changes_leave_placed_orders_alone() {
    let fx = fixture().await;
    let order = fx.services.orders.emit(demo_order(&fx.demo)).await.unwrap();

    let restaurant_id = fx.demo.restaurant_id;
    let mut pad_thai = fx
        .services
        .products
        .find_by_id(restaurant_id, fx.demo.product_a_id)
        .await
        .unwrap();
    pad_thai.price = Decimal::new(1500, 2);
    fx.services.products.save(restaurant_id, pad_thai).await.unwrap();

    let mut restaurant = fx.services.restaurants.find_by_id(restaurant_id).await.unwrap();
    restaurant.freight_rate = Decimal::new(900, 2);
    fx.services.restaurants.save(restaurant).await.unwrap();

    let fetched = fx.services.orders.find_by_code(&order.code).await.unwrap();
    assert_eq!(fetched.items[0].unit_price, Decimal::new(1000, 2));
    assert_eq!(fetched.items[0].total_price, Decimal::new(2000, 2));
    assert_eq!(fetched.freight_fee, Decimal::new(500, 2));
    assert_eq!(fetched.total, Decimal::new(2800, 2));

    // New orders see the new price and freight.
    let next = fx.services.orders.emit(demo_order(&fx.demo)).await.unwrap();
    assert_eq!(next.items[0].unit_price, Decimal::new(1500, 2));
    assert_eq!(next.freight_fee, Decimal::new(900, 2));
    assert_eq!(next.total, Decimal::new(4200, 2));
}

#[tokio::test]
async fn confirm_twice_keeps_the_first_confirmation() {
    let fx = fixture().await;
    let order = fx.services.orders.emit(demo_order(&fx.demo)).await.unwrap();

    let confirmed = fx.services.order_flow.confirm(&order.code).await.unwrap();
    assert_eq!(confirmed.status, OrderStatus::Confirmed);
    let confirmed_at = confirmed.confirmed_at.expect("confirmation time");

    let err = fx.services.order_flow.confirm(&order.code).await.unwrap_err();
    assert!(matches!(err, AppError::BusinessRule(_)));

    let reloaded = fx.services.orders.find_by_code(&order.code).await.unwrap();
    assert_eq!(reloaded.status, OrderStatus::Confirmed);
    assert_eq!(reloaded.confirmed_at, Some(confirmed_at));

    let events = fx.publisher.delivered();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, OrderEventKind::OrderConfirmed);
    assert_eq!(events[0].client_email, "ana@food.dev");
    assert_eq!(events[0].transitioned_at, confirmed_at);
    assert!(fx.services.order_flow.locks().is_empty());
}

#[tokio::test]
async fn delivered_orders_cannot_be_cancelled() {
    let fx = fixture().await;
    let order = fx.services.orders.emit(demo_order(&fx.demo)).await.unwrap();

    assert!(matches!(
        fx.services.order_flow.deliver(&order.code).await,
        Err(AppError::BusinessRule(_))
    ));
    fx.services.order_flow.confirm(&order.code).await.unwrap();
    let delivered = fx.services.order_flow.deliver(&order.code).await.unwrap();
    assert!(delivered.delivered_at.is_some());

    let err = fx.services.order_flow.cancel(&order.code).await.unwrap_err();
    assert!(matches!(err, AppError::BusinessRule(_)));
    let reloaded = fx.services.orders.find_by_code(&order.code).await.unwrap();
    assert_eq!(reloaded.status, OrderStatus::Delivered);
    assert!(reloaded.cancelled_at.is_none());

    assert!(matches!(
        fx.services.order_flow.confirm("missing-code").await,
        Err(AppError::NotFound { entity: "order", .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_terminal_transitions_have_one_winner() {
    let fx = fixture().await;
    let order = fx.services.orders.emit(demo_order(&fx.demo)).await.unwrap();
    fx.services.order_flow.confirm(&order.code).await.unwrap();

    let deliver = {
        let services = fx.services.clone();
        let code = order.code.clone();
        tokio::spawn(async move { services.order_flow.deliver(&code).await })
    };
    let cancel = {
        let services = fx.services.clone();
        let code = order.code.clone();
        tokio::spawn(async move { services.order_flow.cancel(&code).await })
    };
    let results = [deliver.await.unwrap(), cancel.await.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);

    let reloaded = fx.services.orders.find_by_code(&order.code).await.unwrap();
    assert!(reloaded.status.is_terminal());
    // One entry for the confirmation, one for the winning terminal move.
    assert_eq!(fx.orders.outbox_entries().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn status_check_on_write_guards_independent_instances() {
    let fx = fixture().await;
    let order = fx.services.orders.emit(demo_order(&fx.demo)).await.unwrap();

    // A second service graph over the same stores has its own lock table.
    let other = Services::build(
        fx.repos.clone(),
        Arc::new(MemoryCache::new()),
        CacheSettings::default(),
        fx.publisher.clone(),
    );
    let mut handles = Vec::new();
    for services in [fx.services.clone(), other.clone(), fx.services.clone(), other] {
        let code = order.code.clone();
        handles.push(tokio::spawn(async move { services.order_flow.confirm(&code).await }));
    }
    let mut wins = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(e) => assert!(matches!(e, AppError::BusinessRule(_)), "{e:?}"),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(fx.orders.outbox_entries().len(), 1);
}

#[tokio::test]
async fn failed_publish_is_retried_by_the_dispatcher() {
    let fx = fixture().await;
    let order = fx.services.orders.emit(demo_order(&fx.demo)).await.unwrap();

    fx.publisher.set_failing(true);
    let cancelled = fx.services.order_flow.cancel(&order.code).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let entries = fx.orders.outbox_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].attempts, 1);
    assert!(entries[0].dispatched_at.is_none());
    assert!(entries[0].last_error.as_deref().unwrap().contains("broker offline"));

    let dispatcher = fx.services.dispatcher(OutboxSettings {
        poll_interval: Duration::from_millis(10),
        max_attempts: 5,
        batch_size: 10,
        ..OutboxSettings::default()
    });
    let report = dispatcher.dispatch_pending().await.unwrap();
    assert_eq!(report, DispatchReport { dispatched: 0, failed: 1, exhausted: 0 });

    fx.publisher.set_failing(false);
    let report = dispatcher.dispatch_pending().await.unwrap();
    assert_eq!(report.dispatched, 1);
    assert!(fx.orders.outbox_entries()[0].dispatched_at.is_some());

    let delivered = fx.publisher.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].kind, OrderEventKind::OrderCancelled);
    assert_eq!(delivered[0].order_code, order.code);

    assert_eq!(dispatcher.dispatch_pending().await.unwrap(), DispatchReport::default());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn in_flight_publish_is_not_sent_again_by_the_dispatcher() {
    let fx = fixture().await;
    let order = fx.services.orders.emit(demo_order(&fx.demo)).await.unwrap();
    let dispatcher = fx.services.dispatcher(OutboxSettings {
        poll_interval: Duration::from_millis(10),
        ..OutboxSettings::default()
    });

    fx.publisher.set_delay(Duration::from_millis(100));
    let flow = fx.services.order_flow.clone();
    let code = order.code.clone();
    let confirm = tokio::spawn(async move { flow.confirm(&code).await });

    // The transition has committed and its publish is still in flight.
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(fx.orders.outbox_entries().len(), 1);
    assert_eq!(dispatcher.dispatch_pending().await.unwrap(), DispatchReport::default());

    confirm.await.unwrap().unwrap();
    assert_eq!(fx.publisher.delivered().len(), 1);
    let entry = &fx.orders.outbox_entries()[0];
    assert!(entry.dispatched_at.is_some());
    assert!(entry.claimed_until.is_none());
    assert_eq!(dispatcher.dispatch_pending().await.unwrap(), DispatchReport::default());
    assert_eq!(fx.publisher.delivered().len(), 1);
}

#[tokio::test]
async fn dispatcher_gives_up_after_max_attempts() {
    let fx = fixture().await;
    let order = fx.services.orders.emit(demo_order(&fx.demo)).await.unwrap();
    fx.publisher.set_failing(true);
    fx.services.order_flow.confirm(&order.code).await.unwrap();

    let dispatcher = fx.services.dispatcher(OutboxSettings {
        poll_interval: Duration::from_millis(10),
        max_attempts: 2,
        batch_size: 10,
        ..OutboxSettings::default()
    });
    let report = dispatcher.dispatch_pending().await.unwrap();
    assert_eq!(report.exhausted, 1);
    assert_eq!(dispatcher.dispatch_pending().await.unwrap(), DispatchReport::default());

    let entry = &fx.orders.outbox_entries()[0];
    assert_eq!(entry.attempts, 2);
    assert!(entry.dispatched_at.is_none());
}

#[tokio::test]
async fn dispatcher_loop_stops_on_shutdown() {
    let fx = fixture().await;
    let order = fx.services.orders.emit(demo_order(&fx.demo)).await.unwrap();
    fx.publisher.set_failing(true);
    fx.services.order_flow.confirm(&order.code).await.unwrap();
    fx.publisher.set_failing(false);

    let dispatcher = fx.services.dispatcher(OutboxSettings {
        poll_interval: Duration::from_millis(10),
        ..OutboxSettings::default()
    });
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(dispatcher.run(async {
        let _ = stopped.await;
    }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    stop.send(()).unwrap();
    handle.await.unwrap();
    assert!(fx.orders.outbox_entries()[0].dispatched_at.is_some());
}

#[tokio::test]
async fn search_filters_and_pages_newest_first() {
    let fx = fixture().await;
    let first = fx.services.orders.emit(demo_order(&fx.demo)).await.unwrap();
    let second = fx.services.orders.emit(demo_order(&fx.demo)).await.unwrap();
    fx.services.order_flow.confirm(&second.code).await.unwrap();

    let all = fx
        .services
        .orders
        .search(&OrderFilter::default(), Pageable::new(0, 1))
        .await
        .unwrap();
    assert_eq!(all.total_elements, 2);
    assert_eq!(all.total_pages, 2);
    assert_eq!(all.content[0].code, second.code);
    assert!(all.content[0].restaurant.is_some());

    let created_only = OrderFilter {
        status: Some(OrderStatus::Created),
        client_id: Some(fx.demo.client_id),
        ..OrderFilter::default()
    };
    let page = fx
        .services
        .orders
        .search(&created_only, Pageable::default())
        .await
        .unwrap();
    assert_eq!(page.content.len(), 1);
    assert_eq!(page.content[0].code, first.code);
}

#[tokio::test]
async fn pages_past_the_end_are_empty() {
    let fx = fixture().await;
    fx.services.orders.emit(demo_order(&fx.demo)).await.unwrap();

    let page = fx
        .services
        .orders
        .search(&OrderFilter::default(), Pageable::new(u32::MAX, 10))
        .await
        .unwrap();
    assert!(page.content.is_empty());
    assert_eq!(page.total_elements, 1);
    assert!(page.last);
}

#[tokio::test]
async fn daily_sales_count_confirmed_and_delivered_orders() {
    let fx = fixture().await;
    let delivered = fx.services.orders.emit(demo_order(&fx.demo)).await.unwrap();
    let confirmed = fx.services.orders.emit(demo_order(&fx.demo)).await.unwrap();
    let cancelled = fx.services.orders.emit(demo_order(&fx.demo)).await.unwrap();
    fx.services.orders.emit(demo_order(&fx.demo)).await.unwrap();

    let flow = &fx.services.order_flow;
    flow.confirm(&delivered.code).await.unwrap();
    flow.deliver(&delivered.code).await.unwrap();
    flow.confirm(&confirmed.code).await.unwrap();
    flow.cancel(&cancelled.code).await.unwrap();

    let utc = FixedOffset::east_opt(0).unwrap();
    let days = fx.services.orders.daily_sales(&SalesFilter::default(), utc).await.unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0].date, delivered.created_at.date_naive());
    assert_eq!(days[0].total_sales, 2);
    assert_eq!(days[0].total_revenue, Decimal::new(5600, 2));

    let elsewhere = SalesFilter {
        restaurant_id: Some(fx.demo.restaurant_id + 100),
        ..SalesFilter::default()
    };
    assert!(fx.services.orders.daily_sales(&elsewhere, utc).await.unwrap().is_empty());

    let now = Utc::now();
    let backwards = SalesFilter {
        created_from: Some(now),
        created_to: Some(now - chrono::Duration::days(1)),
        ..SalesFilter::default()
    };
    assert!(matches!(
        fx.services.orders.daily_sales(&backwards, utc).await,
        Err(AppError::BadRequest(_))
    ));
}

#[tokio::test]
async fn lookups_read_through_and_invalidate_on_save() {
    let cache = Arc::new(MemoryCache::new());
    let fx = fixture_with(cache.clone(), CacheSettings::default()).await;
    let states = &fx.services.states;

    let state = states.find_by_id(fx.demo.state_id).await.unwrap();
    let key = format!("state:cache:{}", state.id);
    assert!(cache.get(&key).await.unwrap().is_some());

    // Written behind the cache's back: the hit still serves the snapshot.
    StateRepository::save(&fx.catalog, State { id: state.id, name: "SP".into() })
        .await
        .unwrap();
    assert_eq!(states.find_by_id(state.id).await.unwrap().name, state.name);

    states
        .save(State { id: state.id, name: "Sao Paulo".into() })
        .await
        .unwrap();
    assert!(cache.get(&key).await.unwrap().is_none());
    assert_eq!(states.find_by_id(state.id).await.unwrap().name, "Sao Paulo");

    assert!(matches!(
        states.find_by_id(404).await,
        Err(AppError::NotFound { entity: "state", .. })
    ));
    assert!(matches!(
        states.delete(state.id).await,
        Err(AppError::InUse(_))
    ));
}

#[tokio::test]
async fn restaurant_hits_resolve_fresh_associations() {
    let cache = Arc::new(MemoryCache::new());
    let fx = fixture_with(cache.clone(), CacheSettings::default()).await;
    let restaurants = &fx.services.restaurants;
    let id = fx.demo.restaurant_id;

    let first = restaurants.find_by_id(id).await.unwrap();
    assert!(cache.get(&format!("restaurant:cache:{id}")).await.unwrap().is_some());

    restaurants.attach_payment_method(id, fx.demo.cash_id).await.unwrap();
    let after = restaurants.find_by_id(id).await.unwrap();
    assert_eq!(after.payment_methods.len(), first.payment_methods.len() + 1);

    restaurants.close(id).await.unwrap();
    assert!(!restaurants.find_by_id(id).await.unwrap().open);

    // The cash order is accepted once the association exists.
    let mut cash = demo_order(&fx.demo);
    cash.payment_method_id = fx.demo.cash_id;
    assert!(fx.services.orders.emit(cash).await.is_ok());
}

#[tokio::test]
async fn ttl_expiry_heals_a_stale_snapshot() {
    let cache = Arc::new(MemoryCache::new());
    let settings = CacheSettings {
        ttls: CacheTtls {
            location: Duration::from_millis(80),
            ..CacheTtls::default()
        },
        ..CacheSettings::default()
    };
    let fx = fixture_with(cache, settings).await;
    let states = &fx.services.states;

    let original = states.find_by_id(fx.demo.state_id).await.unwrap();
    // A writer commits after the reader repopulated the cache and its
    // invalidation is lost: the stale snapshot lives until its TTL.
    StateRepository::save(&fx.catalog, State { id: original.id, name: "SP".into() })
        .await
        .unwrap();
    assert_eq!(states.find_by_id(original.id).await.unwrap().name, original.name);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(states.find_by_id(original.id).await.unwrap().name, "SP");
}

#[tokio::test]
async fn user_authorities_follow_group_changes() {
    let fx = fixture().await;
    let users = &fx.services.users;
    let id = fx.demo.client_id;

    assert_eq!(users.authorities(id).await.unwrap(), vec!["ORDER_CREATE".to_string()]);

    let mut duplicate = users.find_by_id(id).await.unwrap();
    duplicate.id = 0;
    duplicate.name = "Other Ana".into();
    assert!(matches!(users.save(duplicate).await, Err(AppError::BusinessRule(_))));

    let group_id = users.find_by_id(id).await.unwrap().groups[0].id;
    users.detach_group(id, group_id).await.unwrap();
    assert!(users.authorities(id).await.unwrap().is_empty());
}
