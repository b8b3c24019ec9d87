use std::time::Duration;

use chrono::{DateTime, Utc};
use food_types::domain::user::{Group, User};
use food_types::ports::cache::CacheError;
use serde::{Deserialize, Serialize};

use super::store::CacheStore;

pub fn user_key(id: u64) -> String {
    format!("user:cache:{id}")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedUser {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub groups: Vec<Group>,
    /// Flattened permission names of every group.
    #[serde(default)]
    pub authorities: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for CachedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            groups: user.groups.clone(),
            authorities: user.authorities().into_iter().collect(),
            created_at: user.created_at,
        }
    }
}

impl From<CachedUser> for User {
    fn from(cached: CachedUser) -> Self {
        User {
            id: cached.id,
            name: cached.name,
            email: cached.email,
            groups: cached.groups,
            created_at: cached.created_at,
        }
    }
}

#[derive(Clone)]
pub struct UserCache {
    store: CacheStore,
    ttl: Duration,
}

impl UserCache {
    pub fn new(store: CacheStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub async fn get_user(&self, id: u64) -> Option<CachedUser> {
        self.store.get_json(&user_key(id)).await
    }

    pub async fn set_user(&self, user: &User) -> Result<(), CacheError> {
        self.store
            .set_json(&user_key(user.id), &CachedUser::from(user), self.ttl)
            .await
    }

    pub async fn invalidate_user(&self, id: u64) -> Result<(), CacheError> {
        self.store.delete(&[user_key(id)]).await
    }

    pub async fn authorities(&self, id: u64) -> Option<Vec<String>> {
        self.get_user(id).await.map(|u| u.authorities)
    }
}
