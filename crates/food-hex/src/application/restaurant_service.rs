use std::sync::Arc;

use food_types::domain::business::Restaurant;
use food_types::ports::catalog_repository::RestaurantRepository;

use super::cache::business::CachedRestaurant;
use super::cache::{ignore_failure, BusinessCache};
use super::city_service::CityService;
use super::cuisine_service::CuisineService;
use super::payment_method_service::PaymentMethodService;
use super::user_service::UserService;
use crate::errors::AppError;

pub struct RestaurantService {
    repo: Arc<dyn RestaurantRepository>,
    cuisines: Arc<CuisineService>,
    cities: Arc<CityService>,
    payment_methods: Arc<PaymentMethodService>,
    users: Arc<UserService>,
    cache: BusinessCache,
}

impl RestaurantService {
    pub fn new(
        repo: Arc<dyn RestaurantRepository>,
        cuisines: Arc<CuisineService>,
        cities: Arc<CityService>,
        payment_methods: Arc<PaymentMethodService>,
        users: Arc<UserService>,
        cache: BusinessCache,
    ) -> Self {
        Self {
            repo,
            cuisines,
            cities,
            payment_methods,
            users,
            cache,
        }
    }

    pub async fn find_all(&self) -> Result<Vec<Restaurant>, AppError> {
        Ok(self.repo.find_all().await?)
    }

    pub async fn find_by_id(&self, id: u64) -> Result<Restaurant, AppError> {
        if let Some(cached) = self.cache.get_restaurant(id).await {
            return Ok(self.resolve(cached).await);
        }
        let restaurant = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("restaurant", id))?;
        ignore_failure("store restaurant", self.cache.set_restaurant(&restaurant).await);
        Ok(restaurant)
    }

    /// Rebuilds the associations of a cached snapshot through their own
    /// lookups. Associations that no longer resolve are left out.
    async fn resolve(&self, cached: CachedRestaurant) -> Restaurant {
        let mut restaurant = cached.to_restaurant();
        if cached.cuisine_id > 0 {
            if let Ok(cuisine) = self.cuisines.find_by_id(cached.cuisine_id).await {
                restaurant.cuisine = cuisine;
            }
        }
        if let Some(address) = restaurant.address.as_mut() {
            if let Some(city_id) = address.city_id {
                address.city = self.cities.find_by_id(city_id).await.ok();
            }
        }
        for id in &cached.payment_method_ids {
            match self.payment_methods.find_by_id(*id).await {
                Ok(method) => restaurant.payment_methods.push(method),
                Err(e) => tracing::debug!(restaurant_id = cached.id, payment_method_id = id, error = %e, "payment method skipped"),
            }
        }
        for id in &cached.responsible_ids {
            match self.users.find_by_id(*id).await {
                Ok(user) => restaurant.responsibles.push(user),
                Err(e) => tracing::debug!(restaurant_id = cached.id, user_id = id, error = %e, "responsible skipped"),
            }
        }
        restaurant
    }

    /// Cuisine and, when given, the address city must exist.
    pub async fn save(&self, mut restaurant: Restaurant) -> Result<Restaurant, AppError> {
        restaurant.cuisine = self.cuisines.find_by_id(restaurant.cuisine.id).await?;
        if let Some(address) = restaurant.address.as_mut() {
            if let Some(city_id) = address.city_id.or(address.city.as_ref().map(|c| c.id)) {
                address.city = Some(self.cities.find_by_id(city_id).await?);
                address.city_id = Some(city_id);
            }
        }
        let saved = self.repo.save(restaurant).await?;
        self.invalidate(saved.id).await;
        Ok(saved)
    }

    pub async fn activate(&self, id: u64) -> Result<(), AppError> {
        self.update(id, Restaurant::activate).await
    }

    pub async fn deactivate(&self, id: u64) -> Result<(), AppError> {
        self.update(id, Restaurant::deactivate).await
    }

    pub async fn open(&self, id: u64) -> Result<(), AppError> {
        self.update(id, Restaurant::open).await
    }

    pub async fn close(&self, id: u64) -> Result<(), AppError> {
        self.update(id, Restaurant::close).await
    }

    /// Stops at the first id that fails; earlier ids stay activated.
    pub async fn activate_many(&self, ids: &[u64]) -> Result<(), AppError> {
        for id in ids {
            self.activate(*id).await?;
        }
        Ok(())
    }

    pub async fn deactivate_many(&self, ids: &[u64]) -> Result<(), AppError> {
        for id in ids {
            self.deactivate(*id).await?;
        }
        Ok(())
    }

    pub async fn attach_payment_method(&self, restaurant_id: u64, payment_method_id: u64) -> Result<(), AppError> {
        self.find_by_id(restaurant_id).await?;
        self.payment_methods.find_by_id(payment_method_id).await?;
        self.repo.add_payment_method(restaurant_id, payment_method_id).await?;
        self.invalidate(restaurant_id).await;
        Ok(())
    }

    pub async fn detach_payment_method(&self, restaurant_id: u64, payment_method_id: u64) -> Result<(), AppError> {
        self.find_by_id(restaurant_id).await?;
        self.payment_methods.find_by_id(payment_method_id).await?;
        self.repo.remove_payment_method(restaurant_id, payment_method_id).await?;
        self.invalidate(restaurant_id).await;
        Ok(())
    }

    pub async fn attach_responsible(&self, restaurant_id: u64, user_id: u64) -> Result<(), AppError> {
        self.find_by_id(restaurant_id).await?;
        self.users.find_by_id(user_id).await?;
        self.repo.add_responsible(restaurant_id, user_id).await?;
        self.invalidate(restaurant_id).await;
        Ok(())
    }

    pub async fn detach_responsible(&self, restaurant_id: u64, user_id: u64) -> Result<(), AppError> {
        self.find_by_id(restaurant_id).await?;
        self.users.find_by_id(user_id).await?;
        self.repo.remove_responsible(restaurant_id, user_id).await?;
        self.invalidate(restaurant_id).await;
        Ok(())
    }

    async fn update(&self, id: u64, change: fn(&mut Restaurant)) -> Result<(), AppError> {
        let mut restaurant = self.find_by_id(id).await?;
        change(&mut restaurant);
        self.repo.save(restaurant).await?;
        self.invalidate(id).await;
        Ok(())
    }

    async fn invalidate(&self, id: u64) {
        ignore_failure("invalidate restaurant", self.cache.invalidate_restaurant(id).await);
    }
}
