#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use food_cache::memory::MemoryCache;
use food_hex::application::cache::CacheSettings;
use food_hex::application::{Repositories, Services};
use food_repo::memory::InMemoryRepo;
use food_repo::{seed_demo_data, DemoCatalog, MemoryCatalog};
use food_types::domain::business::Address;
use food_types::domain::event::OrderEvent;
use food_types::domain::order::{NewOrder, NewOrderItem};
use food_types::ports::cache::CacheBackend;
use food_types::ports::event_publisher::{EventPublisher, PublishError};

/// Records delivered events; can be switched to fail every attempt or to
/// stall before each delivery.
#[derive(Default)]
pub struct SwitchPublisher {
    failing: AtomicBool,
    delay_ms: AtomicU64,
    delivered: Mutex<Vec<OrderEvent>>,
}

impl SwitchPublisher {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn delivered(&self) -> Vec<OrderEvent> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for SwitchPublisher {
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError {
                event_type: event.event_type(),
                reason: "broker offline".into(),
            });
        }
        self.delivered.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub struct Fixture {
    pub services: Services,
    pub repos: Repositories,
    pub catalog: MemoryCatalog,
    pub orders: InMemoryRepo,
    pub publisher: Arc<SwitchPublisher>,
    pub demo: DemoCatalog,
}

pub async fn fixture() -> Fixture {
    fixture_with(Arc::new(MemoryCache::new()), CacheSettings::default()).await
}

pub async fn fixture_with(cache: Arc<dyn CacheBackend>, settings: CacheSettings) -> Fixture {
    let catalog = MemoryCatalog::new();
    let demo = seed_demo_data(&catalog).await.unwrap();
    let orders = InMemoryRepo::new();
    let repos = Repositories::from_stores(catalog.clone(), orders.clone());
    let publisher = Arc::new(SwitchPublisher::default());
    let services = Services::build(repos.clone(), cache, settings, publisher.clone());
    Fixture {
        services,
        repos,
        catalog,
        orders,
        publisher,
        demo,
    }
}

/// 2x product A (10.00) and 1x product B (3.00), paid by card, delivered in the demo city.
pub fn demo_order(demo: &DemoCatalog) -> NewOrder {
    NewOrder {
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
                note: Some("no peanuts".into()),
            },
            NewOrderItem {
                product_id: demo.product_b_id,
                quantity: 1,
                note: None,
            },
        ],
    }
}
