#![cfg(feature = "sqlite")]

use std::sync::Arc;

use food_cache::build_cache;
use food_client::{FoodClient, OrderQuery};
use food_hex::application::cache::CacheSettings;
use food_hex::application::{Repositories, Services};
use food_hex::inbound::http::{HttpServer, HttpServerConfig};
use food_hex::outbound::LoggingPublisher;
use food_repo::{build_repo, seed_demo_data, MemoryCatalog};
use food_types::domain::business::Address;
use food_types::domain::order::{NewOrder, NewOrderItem, OrderStatus};
use food_types::domain::page::Pageable;
use rust_decimal::Decimal;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::test]
async fn client_drives_an_order_through_its_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("food.db").display());
    let repo = build_repo(Some(&url)).await.expect("build repo");
    let catalog = MemoryCatalog::new();
    let demo = seed_demo_data(&catalog).await.unwrap();

    let services = Services::build(
        Repositories::from_stores(catalog, repo),
        build_cache(None).await,
        CacheSettings::default(),
        Arc::new(LoggingPublisher),
    );
    let port = find_free_port();
    let server = HttpServer::new(
        services,
        HttpServerConfig {
            port: port.to_string(),
        },
    )
    .await
    .unwrap();
    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let client = FoodClient::new(&format!("http://127.0.0.1:{port}/")).unwrap();
    let created = client
        .create_order(&NewOrder {
            restaurant_id: demo.restaurant_id,
            client_id: demo.client_id,
            payment_method_id: demo.card_id,
            delivery_address: Address {
                city_id: Some(demo.city_id),
                ..Address::default()
            },
            items: vec![NewOrderItem {
                product_id: demo.product_b_id,
                quantity: 3,
                note: None,
            }],
        })
        .await
        .unwrap();
    assert_eq!(created.total, Decimal::new(1400, 2));

    client.confirm_order(&created.code).await.unwrap();
    let delivered = client.deliver_order(&created.code).await.unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert!(client.cancel_order(&created.code).await.is_err());

    let page = client
        .search_orders(&OrderQuery {
            status: Some(OrderStatus::Delivered),
            page: Pageable::new(0, 5),
            ..OrderQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total_elements, 1);
    assert_eq!(client.get_order(&created.code).await.unwrap().code, created.code);

    handle.abort();
}
