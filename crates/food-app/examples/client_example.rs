///  To run :
///  cargo r --example client_example
use std::sync::Arc;

use food_cache::build_cache;
use food_client::{FoodClient, OrderQuery};
use food_hex::application::cache::CacheSettings;
use food_hex::application::{Repositories, Services};
use food_hex::inbound::http::{HttpServer, HttpServerConfig};
use food_hex::outbound::LoggingPublisher;
use food_repo::{build_repo, seed_demo_data, MemoryCatalog};
use food_types::domain::business::Address;
use food_types::domain::order::{NewOrder, NewOrderItem};
use tempfile::tempdir;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port = find_free_port();
    let addr = format!("http://127.0.0.1:{port}/");

    // Use a temp file-backed SQLite DB so multiple connections see the same data.
    let tmp = tempdir()?;
    let db_url = format!("sqlite://{}", tmp.path().join("food.db").display());

    let repo = build_repo(Some(&db_url)).await?;
    let catalog = MemoryCatalog::new();
    let demo = seed_demo_data(&catalog).await?;
    let services = Services::build(
        Repositories::from_stores(catalog, repo),
        build_cache(None).await,
        CacheSettings::default(),
        Arc::new(LoggingPublisher),
    );
    let server = HttpServer::new(
        services,
        HttpServerConfig {
            port: port.to_string(),
        },
    )
    .await?;

    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let client = FoodClient::new(&addr)?;
    let created = client
        .create_order(&NewOrder {
            restaurant_id: demo.restaurant_id,
            client_id: demo.client_id,
            payment_method_id: demo.card_id,
            delivery_address: Address {
                street: "Rua das Flores".into(),
                number: "42".into(),
                city_id: Some(demo.city_id),
                ..Address::default()
            },
            items: vec![
                NewOrderItem {
                    product_id: demo.product_a_id,
                    quantity: 2,
                    note: Some("extra lime".into()),
                },
                NewOrderItem {
                    product_id: demo.product_b_id,
                    quantity: 1,
                    note: None,
                },
            ],
        })
        .await?;
    println!("Created order code={} total={}", created.code, created.total);

    let confirmed = client.confirm_order(&created.code).await?;
    println!("Confirmed at {:?}", confirmed.confirmed_at);

    let delivered = client.deliver_order(&created.code).await?;
    println!("Status={}", delivered.status);

    if let Err(err) = client.cancel_order(&created.code).await {
        println!("Cancelling a delivered order is rejected: {err}");
    }

    let page = client
        .search_orders(&OrderQuery {
            client_id: Some(demo.client_id),
            ..OrderQuery::default()
        })
        .await?;
    println!("Client has {} order(s)", page.total_elements);

    handle.abort();
    Ok(())
}
