use std::sync::Arc;

use food_types::domain::location::City;
use food_types::ports::catalog_repository::CityRepository;

use super::cache::{ignore_failure, LocationCache};
use super::state_service::StateService;
use crate::errors::AppError;

pub struct CityService {
    repo: Arc<dyn CityRepository>,
    states: Arc<StateService>,
    cache: LocationCache,
}

impl CityService {
    pub fn new(repo: Arc<dyn CityRepository>, states: Arc<StateService>, cache: LocationCache) -> Self {
        Self { repo, states, cache }
    }

    pub async fn find_all(&self) -> Result<Vec<City>, AppError> {
        if let Some(cities) = self.cache.get_all_cities().await {
            return Ok(cities);
        }
        let cities = self.repo.find_all().await?;
        ignore_failure("store city list", self.cache.set_all_cities(&cities).await);
        Ok(cities)
    }

    pub async fn find_by_state(&self, state_id: u64) -> Result<Vec<City>, AppError> {
        if let Some(cities) = self.cache.get_cities_by_state(state_id).await {
            return Ok(cities);
        }
        self.states.find_by_id(state_id).await?;
        let cities = self.repo.find_by_state(state_id).await?;
        ignore_failure(
            "store state city list",
            self.cache.set_cities_by_state(state_id, &cities).await,
        );
        Ok(cities)
    }

    pub async fn find_by_id(&self, id: u64) -> Result<City, AppError> {
        if let Some(city) = self.cache.get_city(id).await {
            return Ok(city);
        }
        let city = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("city", id))?;
        ignore_failure("store city", self.cache.set_city(&city).await);
        Ok(city)
    }

    /// The referenced state must exist.
    pub async fn save(&self, mut city: City) -> Result<City, AppError> {
        city.state = self.states.find_by_id(city.state.id).await?;
        let previous = if city.id == 0 {
            None
        } else {
            self.repo.find_by_id(city.id).await?
        };

        let saved = self.repo.save(city).await?;
        ignore_failure("invalidate city", self.cache.invalidate_city(&saved).await);
        if let Some(previous) = previous.filter(|p| p.state.id != saved.state.id) {
            ignore_failure("invalidate city", self.cache.invalidate_city(&previous).await);
        }
        Ok(saved)
    }

    pub async fn delete(&self, id: u64) -> Result<(), AppError> {
        let city = self.find_by_id(id).await?;
        if !self.repo.delete(id).await? {
            return Err(AppError::not_found("city", id));
        }
        ignore_failure("invalidate city", self.cache.invalidate_city(&city).await);
        Ok(())
    }
}
