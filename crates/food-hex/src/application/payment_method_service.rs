use std::sync::Arc;

use food_types::domain::business::PaymentMethod;
use food_types::ports::catalog_repository::PaymentMethodRepository;

use super::cache::{ignore_failure, BusinessCache};
use crate::errors::AppError;

pub struct PaymentMethodService {
    repo: Arc<dyn PaymentMethodRepository>,
    cache: BusinessCache,
}

impl PaymentMethodService {
    pub fn new(repo: Arc<dyn PaymentMethodRepository>, cache: BusinessCache) -> Self {
        Self { repo, cache }
    }

    pub async fn find_all(&self) -> Result<Vec<PaymentMethod>, AppError> {
        if let Some(methods) = self.cache.get_all_payment_methods().await {
            return Ok(methods);
        }
        let methods = self.repo.find_all().await?;
        ignore_failure(
            "store payment method list",
            self.cache.set_all_payment_methods(&methods).await,
        );
        Ok(methods)
    }

    pub async fn find_by_id(&self, id: u64) -> Result<PaymentMethod, AppError> {
        if let Some(method) = self.cache.get_payment_method(id).await {
            return Ok(method);
        }
        let method = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("payment method", id))?;
        ignore_failure("store payment method", self.cache.set_payment_method(&method).await);
        Ok(method)
    }

    pub async fn save(&self, payment_method: PaymentMethod) -> Result<PaymentMethod, AppError> {
        let saved = self.repo.save(payment_method).await?;
        ignore_failure(
            "invalidate payment method",
            self.cache.invalidate_payment_method(saved.id).await,
        );
        Ok(saved)
    }

    pub async fn delete(&self, id: u64) -> Result<(), AppError> {
        self.find_by_id(id).await?;
        if !self.repo.delete(id).await? {
            return Err(AppError::not_found("payment method", id));
        }
        ignore_failure(
            "invalidate payment method",
            self.cache.invalidate_payment_method(id).await,
        );
        Ok(())
    }
}
