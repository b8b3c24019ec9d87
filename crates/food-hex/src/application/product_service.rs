use std::sync::Arc;

use food_types::domain::business::Product;
use food_types::ports::catalog_repository::ProductRepository;

use super::restaurant_service::RestaurantService;
use crate::errors::AppError;

pub struct ProductService {
    repo: Arc<dyn ProductRepository>,
    restaurants: Arc<RestaurantService>,
}

impl ProductService {
    pub fn new(repo: Arc<dyn ProductRepository>, restaurants: Arc<RestaurantService>) -> Self {
        Self { repo, restaurants }
    }

    pub async fn find_all_by_restaurant(
        &self,
        restaurant_id: u64,
        include_inactive: bool,
    ) -> Result<Vec<Product>, AppError> {
        self.restaurants.find_by_id(restaurant_id).await?;
        Ok(self
            .repo
            .find_all_by_restaurant(restaurant_id, include_inactive)
            .await?)
    }

    /// Products of other restaurants are reported as missing.
    pub async fn find_by_id(&self, restaurant_id: u64, product_id: u64) -> Result<Product, AppError> {
        self.restaurants.find_by_id(restaurant_id).await?;
        self.repo
            .find_by_id(restaurant_id, product_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("product", format!("{product_id} of restaurant {restaurant_id}"))
            })
    }

    pub async fn save(&self, restaurant_id: u64, mut product: Product) -> Result<Product, AppError> {
        if product.id != 0 {
            self.find_by_id(restaurant_id, product.id).await?;
        } else {
            self.restaurants.find_by_id(restaurant_id).await?;
        }
        product.restaurant_id = restaurant_id;
        Ok(self.repo.save(product).await?)
    }
}
