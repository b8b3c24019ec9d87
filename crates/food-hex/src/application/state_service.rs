use std::sync::Arc;

use food_types::domain::location::{City, State};
use food_types::ports::catalog_repository::StateRepository;

use super::cache::{ignore_failure, LocationCache};
use crate::errors::AppError;

pub struct StateService {
    repo: Arc<dyn StateRepository>,
    cache: LocationCache,
}

impl StateService {
    pub fn new(repo: Arc<dyn StateRepository>, cache: LocationCache) -> Self {
        Self { repo, cache }
    }

    pub async fn find_all(&self) -> Result<Vec<State>, AppError> {
        if let Some(states) = self.cache.get_all_states().await {
            return Ok(states);
        }
        let states = self.repo.find_all().await?;
        ignore_failure("store state list", self.cache.set_all_states(&states).await);
        Ok(states)
    }

    pub async fn find_by_id(&self, id: u64) -> Result<State, AppError> {
        if let Some(state) = self.cache.get_state(id).await {
            return Ok(state);
        }
        let state = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("state", id))?;
        ignore_failure("store state", self.cache.set_state(&state).await);
        Ok(state)
    }

    pub async fn save(&self, state: State) -> Result<State, AppError> {
        let saved = self.repo.save(state).await?;
        ignore_failure("invalidate state", self.cache.invalidate_state(saved.id).await);
        Ok(saved)
    }

    pub async fn delete(&self, id: u64) -> Result<(), AppError> {
        self.find_by_id(id).await?;
        if !self.repo.delete(id).await? {
            return Err(AppError::not_found("state", id));
        }
        ignore_failure("invalidate state", self.cache.invalidate_state(id).await);
        Ok(())
    }

    /// Best-effort preload of the location snapshots.
    pub async fn warm_up(&self, states: &[State], cities: &[City]) {
        ignore_failure("warm up locations", self.cache.warm_up(states, cities).await);
    }
}
