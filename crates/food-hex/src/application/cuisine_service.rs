use std::sync::Arc;

use food_types::domain::business::Cuisine;
use food_types::domain::page::{Page, Pageable};
use food_types::ports::catalog_repository::CuisineRepository;

use super::cache::{ignore_failure, BusinessCache};
use crate::errors::AppError;

pub struct CuisineService {
    repo: Arc<dyn CuisineRepository>,
    cache: BusinessCache,
}

impl CuisineService {
    pub fn new(repo: Arc<dyn CuisineRepository>, cache: BusinessCache) -> Self {
        Self { repo, cache }
    }

    /// Paged listing straight from the store.
    pub async fn find_all(&self, page: Pageable) -> Result<Page<Cuisine>, AppError> {
        let all = self.repo.find_all().await?;
        let total = all.len() as u64;
        let content = all
            .into_iter()
            .skip(page.offset())
            .take(page.size as usize)
            .collect();
        Ok(Page::new(content, total, page))
    }

    pub async fn find_by_id(&self, id: u64) -> Result<Cuisine, AppError> {
        if let Some(cuisine) = self.cache.get_cuisine(id).await {
            return Ok(cuisine);
        }
        let cuisine = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("cuisine", id))?;
        ignore_failure("store cuisine", self.cache.set_cuisine(&cuisine).await);
        Ok(cuisine)
    }

    pub async fn save(&self, cuisine: Cuisine) -> Result<Cuisine, AppError> {
        let saved = self.repo.save(cuisine).await?;
        ignore_failure("invalidate cuisine", self.cache.invalidate_cuisine(saved.id).await);
        Ok(saved)
    }

    pub async fn delete(&self, id: u64) -> Result<(), AppError> {
        self.find_by_id(id).await?;
        if !self.repo.delete(id).await? {
            return Err(AppError::not_found("cuisine", id));
        }
        ignore_failure("invalidate cuisine", self.cache.invalidate_cuisine(id).await);
        Ok(())
    }
}
