use std::sync::Arc;

use food_types::ports::cache::CacheBackend;
use food_types::ports::catalog_repository::{
    CityRepository, CuisineRepository, GroupRepository, PaymentMethodRepository, ProductRepository,
    RestaurantRepository, StateRepository, UserRepository,
};
use food_types::ports::event_publisher::EventPublisher;
use food_types::ports::order_repository::{OrderRepository, OutboxRepository};

pub mod cache;
pub mod city_service;
pub mod cuisine_service;
pub mod order_flow_service;
pub mod order_service;
pub mod outbox;
pub mod payment_method_service;
pub mod product_service;
pub mod restaurant_service;
pub mod state_service;
pub mod user_service;

use cache::{BusinessCache, CacheSettings, CacheStore, LocationCache, UserCache};
use city_service::CityService;
use cuisine_service::CuisineService;
use order_flow_service::OrderFlowService;
use order_service::OrderService;
use outbox::{OutboxDispatcher, OutboxSettings};
use payment_method_service::PaymentMethodService;
use product_service::ProductService;
use restaurant_service::RestaurantService;
use state_service::StateService;
use user_service::UserService;

/// Every store the services read from or write to.
#[derive(Clone)]
pub struct Repositories {
    pub states: Arc<dyn StateRepository>,
    pub cities: Arc<dyn CityRepository>,
    pub cuisines: Arc<dyn CuisineRepository>,
    pub payment_methods: Arc<dyn PaymentMethodRepository>,
    pub restaurants: Arc<dyn RestaurantRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub outbox: Arc<dyn OutboxRepository>,
}

impl Repositories {
    /// One catalog value backs every catalog port, one order store backs
    /// orders and their outbox.
    pub fn from_stores<C, O>(catalog: C, orders: O) -> Self
    where
        C: StateRepository
            + CityRepository
            + CuisineRepository
            + PaymentMethodRepository
            + RestaurantRepository
            + ProductRepository
            + UserRepository
            + GroupRepository,
        O: OrderRepository + OutboxRepository,
    {
        let catalog = Arc::new(catalog);
        let orders = Arc::new(orders);
        Self {
            states: catalog.clone(),
            cities: catalog.clone(),
            cuisines: catalog.clone(),
            payment_methods: catalog.clone(),
            restaurants: catalog.clone(),
            products: catalog.clone(),
            users: catalog.clone(),
            groups: catalog,
            orders: orders.clone(),
            outbox: orders,
        }
    }
}

#[derive(Clone)]
pub struct Services {
    pub states: Arc<StateService>,
    pub cities: Arc<CityService>,
    pub cuisines: Arc<CuisineService>,
    pub payment_methods: Arc<PaymentMethodService>,
    pub restaurants: Arc<RestaurantService>,
    pub products: Arc<ProductService>,
    pub users: Arc<UserService>,
    pub orders: Arc<OrderService>,
    pub order_flow: Arc<OrderFlowService>,
    cache: CacheStore,
    outbox: Arc<dyn OutboxRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl Services {
    pub fn build(
        repos: Repositories,
        cache_backend: Arc<dyn CacheBackend>,
        settings: CacheSettings,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        let store = CacheStore::new(cache_backend, settings.timeout);
        let location = LocationCache::new(store.clone(), settings.ttls.location);
        let business = BusinessCache::new(store.clone(), settings.ttls.clone());
        let user_cache = UserCache::new(store.clone(), settings.ttls.user);

        let states = Arc::new(StateService::new(repos.states, location.clone()));
        let cities = Arc::new(CityService::new(repos.cities, states.clone(), location));
        let cuisines = Arc::new(CuisineService::new(repos.cuisines, business.clone()));
        let payment_methods = Arc::new(PaymentMethodService::new(
            repos.payment_methods,
            business.clone(),
        ));
        let users = Arc::new(UserService::new(repos.users, repos.groups, user_cache));
        let restaurants = Arc::new(RestaurantService::new(
            repos.restaurants,
            cuisines.clone(),
            cities.clone(),
            payment_methods.clone(),
            users.clone(),
            business,
        ));
        let products = Arc::new(ProductService::new(repos.products, restaurants.clone()));
        let orders = Arc::new(OrderService::new(
            repos.orders.clone(),
            restaurants.clone(),
            payment_methods.clone(),
            users.clone(),
            cities.clone(),
            products.clone(),
        ));
        let order_flow = Arc::new(OrderFlowService::new(
            orders.clone(),
            repos.orders,
            repos.outbox.clone(),
            publisher.clone(),
        ));

        Self {
            states,
            cities,
            cuisines,
            payment_methods,
            restaurants,
            products,
            users,
            orders,
            order_flow,
            cache: store,
            outbox: repos.outbox,
            publisher,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Background re-delivery over the same outbox and publisher.
    pub fn dispatcher(&self, settings: OutboxSettings) -> OutboxDispatcher {
        OutboxDispatcher::new(self.outbox.clone(), self.publisher.clone(), settings)
    }

    /// Loads states and cities into the cache. Returns how many of each.
    pub async fn warm_up_locations(&self) -> Result<(usize, usize), crate::errors::AppError> {
        let states = self.states.find_all().await?;
        let cities = self.cities.find_all().await?;
        self.states.warm_up(&states, &cities).await;
        Ok((states.len(), cities.len()))
    }
}
