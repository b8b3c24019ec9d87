use std::sync::Arc;

use chrono::FixedOffset;
use food_types::domain::order::{NewOrder, Order, OrderItem};
use food_types::domain::page::{Page, Pageable};
use food_types::domain::sales::DailySales;
use food_types::ports::order_repository::{OrderFilter, OrderRepository, SalesFilter};

use super::city_service::CityService;
use super::payment_method_service::PaymentMethodService;
use super::product_service::ProductService;
use super::restaurant_service::RestaurantService;
use super::user_service::UserService;
use crate::errors::AppError;

pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
    restaurants: Arc<RestaurantService>,
    payment_methods: Arc<PaymentMethodService>,
    users: Arc<UserService>,
    cities: Arc<CityService>,
    products: Arc<ProductService>,
}

impl OrderService {
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        restaurants: Arc<RestaurantService>,
        payment_methods: Arc<PaymentMethodService>,
        users: Arc<UserService>,
        cities: Arc<CityService>,
        products: Arc<ProductService>,
    ) -> Self {
        Self {
            repo,
            restaurants,
            payment_methods,
            users,
            cities,
            products,
        }
    }

    /// Validates every reference, snapshots prices and persists the order.
    /// Nothing is written unless all checks pass.
    pub async fn emit(&self, new_order: NewOrder) -> Result<Order, AppError> {
        if new_order.items.is_empty() {
            return Err(AppError::BusinessRule("an order needs at least one item".into()));
        }
        if let Some(item) = new_order.items.iter().find(|i| i.quantity == 0) {
            return Err(AppError::BusinessRule(format!(
                "quantity for product {} must be greater than zero",
                item.product_id
            )));
        }

        let restaurant = self.restaurants.find_by_id(new_order.restaurant_id).await?;
        let payment_method = self
            .payment_methods
            .find_by_id(new_order.payment_method_id)
            .await?;
        if !restaurant.accepts_payment_method(&payment_method) {
            return Err(AppError::BusinessRule(format!(
                "payment method '{}' is not accepted by restaurant {}",
                payment_method.description, restaurant.name
            )));
        }
        let client = self.users.find_by_id(new_order.client_id).await?;

        let mut address = new_order.delivery_address;
        if let Some(city_id) = address.city_id {
            address.city = Some(self.cities.find_by_id(city_id).await?);
        }

        let mut items = Vec::with_capacity(new_order.items.len());
        for line in new_order.items {
            let product = self.products.find_by_id(restaurant.id, line.product_id).await?;
            let mut item = OrderItem::new(product.id, product.name, line.quantity, product.price);
            item.note = line.note;
            items.push(item);
        }

        let mut order = Order::new(restaurant.id, client.id, payment_method.id, address, items);
        order.set_freight(restaurant.freight_rate);
        order.compute_totals();
        order.assign_code();
        order.restaurant = Some(restaurant);
        order.client = Some(client);
        order.payment_method = Some(payment_method);

        let created = self.repo.create(order).await?;
        tracing::info!(
            order_code = %created.code,
            restaurant_id = created.restaurant_id,
            client_id = created.client_id,
            total = %created.total,
            "order placed"
        );
        Ok(created)
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Order, AppError> {
        let mut order = self
            .repo
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::not_found("order", code))?;
        self.populate(&mut order).await;
        Ok(order)
    }

    pub async fn search(&self, filter: &OrderFilter, page: Pageable) -> Result<Page<Order>, AppError> {
        let mut result = self.repo.search(filter, page).await?;
        for order in result.content.iter_mut() {
            self.populate(order).await;
        }
        Ok(result)
    }

    /// Confirmed and delivered orders per creation day, as seen in `offset`.
    pub async fn daily_sales(
        &self,
        filter: &SalesFilter,
        offset: FixedOffset,
    ) -> Result<Vec<DailySales>, AppError> {
        if let (Some(from), Some(to)) = (filter.created_from, filter.created_to) {
            if from > to {
                return Err(AppError::BadRequest(format!(
                    "created_from {from} is after created_to {to}"
                )));
            }
        }
        Ok(self.repo.daily_sales(filter, offset).await?)
    }

    /// Fills in missing associations through the cached lookups. A failed
    /// lookup leaves that association empty.
    pub async fn populate(&self, order: &mut Order) {
        if order.restaurant.is_none() {
            match self.restaurants.find_by_id(order.restaurant_id).await {
                Ok(restaurant) => order.restaurant = Some(restaurant),
                Err(e) => tracing::warn!(order_code = %order.code, error = %e, "restaurant not populated"),
            }
        }
        if order.client.is_none() {
            match self.users.find_by_id(order.client_id).await {
                Ok(client) => order.client = Some(client),
                Err(e) => tracing::warn!(order_code = %order.code, error = %e, "client not populated"),
            }
        }
        if order.payment_method.is_none() {
            match self.payment_methods.find_by_id(order.payment_method_id).await {
                Ok(method) => order.payment_method = Some(method),
                Err(e) => tracing::warn!(order_code = %order.code, error = %e, "payment method not populated"),
            }
        }
        let address = &mut order.delivery_address;
        if address.city.is_none() {
            if let Some(city_id) = address.city_id {
                match self.cities.find_by_id(city_id).await {
                    Ok(city) => address.city = Some(city),
                    Err(e) => tracing::warn!(city_id, error = %e, "delivery city not populated"),
                }
            }
        }
    }
}
