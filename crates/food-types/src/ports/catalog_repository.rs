//! Source-of-truth ports for the catalog. `save` inserts when the entity id
//! is `0` and overwrites otherwise; it returns the stored entity.

use async_trait::async_trait;

use super::order_repository::RepoError;
use crate::domain::business::{Cuisine, PaymentMethod, Product, Restaurant};
use crate::domain::location::{City, State};
use crate::domain::user::{Group, User};

#[async_trait]
pub trait StateRepository: Send + Sync + 'static {
    async fn find_all(&self) -> Result<Vec<State>, RepoError>;
    async fn find_by_id(&self, id: u64) -> Result<Option<State>, RepoError>;
    async fn save(&self, state: State) -> Result<State, RepoError>;
    /// `Ok(false)` when nothing was stored under `id`.
    async fn delete(&self, id: u64) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait CityRepository: Send + Sync + 'static {
    async fn find_all(&self) -> Result<Vec<City>, RepoError>;
    async fn find_by_state(&self, state_id: u64) -> Result<Vec<City>, RepoError>;
    async fn find_by_id(&self, id: u64) -> Result<Option<City>, RepoError>;
    async fn save(&self, city: City) -> Result<City, RepoError>;
    async fn delete(&self, id: u64) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait CuisineRepository: Send + Sync + 'static {
    async fn find_all(&self) -> Result<Vec<Cuisine>, RepoError>;
    async fn find_by_id(&self, id: u64) -> Result<Option<Cuisine>, RepoError>;
    async fn save(&self, cuisine: Cuisine) -> Result<Cuisine, RepoError>;
    async fn delete(&self, id: u64) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait PaymentMethodRepository: Send + Sync + 'static {
    async fn find_all(&self) -> Result<Vec<PaymentMethod>, RepoError>;
    async fn find_by_id(&self, id: u64) -> Result<Option<PaymentMethod>, RepoError>;
    async fn save(&self, payment_method: PaymentMethod) -> Result<PaymentMethod, RepoError>;
    async fn delete(&self, id: u64) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait RestaurantRepository: Send + Sync + 'static {
    async fn find_all(&self) -> Result<Vec<Restaurant>, RepoError>;
    async fn find_by_id(&self, id: u64) -> Result<Option<Restaurant>, RepoError>;
    /// Associations (payment methods, responsibles) are managed by the
    /// dedicated methods below and are not touched by `save`.
    async fn save(&self, restaurant: Restaurant) -> Result<Restaurant, RepoError>;
    async fn add_payment_method(&self, restaurant_id: u64, payment_method_id: u64) -> Result<(), RepoError>;
    async fn remove_payment_method(&self, restaurant_id: u64, payment_method_id: u64) -> Result<(), RepoError>;
    async fn add_responsible(&self, restaurant_id: u64, user_id: u64) -> Result<(), RepoError>;
    async fn remove_responsible(&self, restaurant_id: u64, user_id: u64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync + 'static {
    async fn find_all_by_restaurant(
        &self,
        restaurant_id: u64,
        include_inactive: bool,
    ) -> Result<Vec<Product>, RepoError>;
    /// Only matches a product owned by `restaurant_id`.
    async fn find_by_id(&self, restaurant_id: u64, product_id: u64) -> Result<Option<Product>, RepoError>;
    async fn save(&self, product: Product) -> Result<Product, RepoError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    async fn find_all(&self) -> Result<Vec<User>, RepoError>;
    async fn find_by_id(&self, id: u64) -> Result<Option<User>, RepoError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    /// Group membership is managed by `add_group`/`remove_group`.
    async fn save(&self, user: User) -> Result<User, RepoError>;
    async fn add_group(&self, user_id: u64, group_id: u64) -> Result<(), RepoError>;
    async fn remove_group(&self, user_id: u64, group_id: u64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait GroupRepository: Send + Sync + 'static {
    async fn find_all(&self) -> Result<Vec<Group>, RepoError>;
    async fn find_by_id(&self, id: u64) -> Result<Option<Group>, RepoError>;
    async fn save(&self, group: Group) -> Result<Group, RepoError>;
}
