use std::sync::Arc;

use food_types::domain::user::User;
use food_types::ports::catalog_repository::{GroupRepository, UserRepository};

use super::cache::{ignore_failure, UserCache};
use crate::errors::AppError;

pub struct UserService {
    repo: Arc<dyn UserRepository>,
    groups: Arc<dyn GroupRepository>,
    cache: UserCache,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, groups: Arc<dyn GroupRepository>, cache: UserCache) -> Self {
        Self { repo, groups, cache }
    }

    pub async fn find_all(&self) -> Result<Vec<User>, AppError> {
        Ok(self.repo.find_all().await?)
    }

    pub async fn find_by_id(&self, id: u64) -> Result<User, AppError> {
        if let Some(cached) = self.cache.get_user(id).await {
            return Ok(cached.into());
        }
        let user = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("user", id))?;
        ignore_failure("store user", self.cache.set_user(&user).await);
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<User, AppError> {
        self.repo
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::not_found("user", email))
    }

    /// E-mail addresses are unique across users.
    pub async fn save(&self, user: User) -> Result<User, AppError> {
        if let Some(existing) = self.repo.find_by_email(&user.email).await? {
            if existing.id != user.id {
                return Err(AppError::BusinessRule(format!(
                    "a user with e-mail {} already exists",
                    user.email
                )));
            }
        }
        let saved = self.repo.save(user).await?;
        ignore_failure("invalidate user", self.cache.invalidate_user(saved.id).await);
        Ok(saved)
    }

    pub async fn attach_group(&self, user_id: u64, group_id: u64) -> Result<(), AppError> {
        self.find_by_id(user_id).await?;
        self.group_exists(group_id).await?;
        self.repo.add_group(user_id, group_id).await?;
        ignore_failure("invalidate user", self.cache.invalidate_user(user_id).await);
        Ok(())
    }

    pub async fn detach_group(&self, user_id: u64, group_id: u64) -> Result<(), AppError> {
        self.find_by_id(user_id).await?;
        self.group_exists(group_id).await?;
        self.repo.remove_group(user_id, group_id).await?;
        ignore_failure("invalidate user", self.cache.invalidate_user(user_id).await);
        Ok(())
    }

    /// Permission names granted to the user, served from the snapshot when cached.
    pub async fn authorities(&self, user_id: u64) -> Result<Vec<String>, AppError> {
        if let Some(authorities) = self.cache.authorities(user_id).await {
            return Ok(authorities);
        }
        let user = self.find_by_id(user_id).await?;
        Ok(user.authorities().into_iter().collect())
    }

    async fn group_exists(&self, group_id: u64) -> Result<(), AppError> {
        self.groups
            .find_by_id(group_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::not_found("group", group_id))
    }
}
