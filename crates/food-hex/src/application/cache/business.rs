use chrono::{DateTime, Utc};
use food_types::domain::business::{Address, Cuisine, PaymentMethod, Restaurant};
use food_types::ports::cache::CacheError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::store::CacheStore;
use super::CacheTtls;

pub const ALL_CUISINES_KEY: &str = "cuisine:all";
pub const ALL_PAYMENT_METHODS_KEY: &str = "payment_method:all";
pub const ALL_RESTAURANTS_KEY: &str = "restaurant:all";

pub fn cuisine_key(id: u64) -> String {
    format!("cuisine:cache:{id}")
}

pub fn payment_method_key(id: u64) -> String {
    format!("payment_method:cache:{id}")
}

pub fn restaurant_key(id: u64) -> String {
    format!("restaurant:cache:{id}")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedCuisine {
    pub id: u64,
    pub name: String,
}

impl From<&Cuisine> for CachedCuisine {
    fn from(c: &Cuisine) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
        }
    }
}

impl From<CachedCuisine> for Cuisine {
    fn from(c: CachedCuisine) -> Self {
        Cuisine { id: c.id, name: c.name }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedPaymentMethod {
    pub id: u64,
    pub description: String,
}

impl From<&PaymentMethod> for CachedPaymentMethod {
    fn from(p: &PaymentMethod) -> Self {
        Self {
            id: p.id,
            description: p.description.clone(),
        }
    }
}

impl From<CachedPaymentMethod> for PaymentMethod {
    fn from(p: CachedPaymentMethod) -> Self {
        PaymentMethod {
            id: p.id,
            description: p.description,
        }
    }
}

/// Restaurant snapshot. Associations are kept as ids and re-resolved on read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedRestaurant {
    pub id: u64,
    pub name: String,
    pub freight_rate: Decimal,
    pub active: bool,
    pub open: bool,
    pub cuisine_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<CachedCuisine>,
    /// Street fields and city id only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default)]
    pub payment_method_ids: Vec<u64>,
    #[serde(default)]
    pub responsible_ids: Vec<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Restaurant> for CachedRestaurant {
    fn from(r: &Restaurant) -> Self {
        let address = r.address.as_ref().map(|a| {
            let mut address = a.clone();
            address.city_id = address.city_id.or(address.city.as_ref().map(|c| c.id));
            address.city = None;
            address
        });
        Self {
            id: r.id,
            name: r.name.clone(),
            freight_rate: r.freight_rate,
            active: r.active,
            open: r.open,
            cuisine_id: r.cuisine.id,
            cuisine: (r.cuisine.id > 0).then(|| CachedCuisine::from(&r.cuisine)),
            address,
            payment_method_ids: r.payment_methods.iter().map(|p| p.id).collect(),
            responsible_ids: r.responsibles.iter().map(|u| u.id).collect(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl CachedRestaurant {
    /// Partial restaurant: associations other than the cuisine are left empty.
    pub fn to_restaurant(&self) -> Restaurant {
        let cuisine = self.cuisine.clone().map(Cuisine::from).unwrap_or(Cuisine {
            id: self.cuisine_id,
            name: String::new(),
        });
        Restaurant {
            id: self.id,
            name: self.name.clone(),
            freight_rate: self.freight_rate,
            cuisine,
            address: self.address.clone(),
            active: self.active,
            open: self.open,
            payment_methods: Vec::new(),
            responsibles: Vec::new(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Cuisines, payment methods and restaurants.
#[derive(Clone)]
pub struct BusinessCache {
    store: CacheStore,
    ttls: CacheTtls,
}

impl BusinessCache {
    pub fn new(store: CacheStore, ttls: CacheTtls) -> Self {
        Self { store, ttls }
    }

    pub async fn get_cuisine(&self, id: u64) -> Option<Cuisine> {
        self.store
            .get_json::<CachedCuisine>(&cuisine_key(id))
            .await
            .map(Cuisine::from)
    }

    pub async fn set_cuisine(&self, cuisine: &Cuisine) -> Result<(), CacheError> {
        self.store
            .set_json(&cuisine_key(cuisine.id), &CachedCuisine::from(cuisine), self.ttls.cuisine)
            .await
    }

    pub async fn invalidate_cuisine(&self, id: u64) -> Result<(), CacheError> {
        self.store
            .delete(&[cuisine_key(id), ALL_CUISINES_KEY.to_string()])
            .await
    }

    pub async fn get_payment_method(&self, id: u64) -> Option<PaymentMethod> {
        self.store
            .get_json::<CachedPaymentMethod>(&payment_method_key(id))
            .await
            .map(PaymentMethod::from)
    }

    pub async fn set_payment_method(&self, payment_method: &PaymentMethod) -> Result<(), CacheError> {
        self.store
            .set_json(
                &payment_method_key(payment_method.id),
                &CachedPaymentMethod::from(payment_method),
                self.ttls.payment_method,
            )
            .await
    }

    pub async fn get_all_payment_methods(&self) -> Option<Vec<PaymentMethod>> {
        let cached: Vec<CachedPaymentMethod> = self.store.get_json(ALL_PAYMENT_METHODS_KEY).await?;
        Some(cached.into_iter().map(PaymentMethod::from).collect())
    }

    pub async fn set_all_payment_methods(&self, methods: &[PaymentMethod]) -> Result<(), CacheError> {
        let cached: Vec<CachedPaymentMethod> = methods.iter().map(CachedPaymentMethod::from).collect();
        self.store
            .set_json(ALL_PAYMENT_METHODS_KEY, &cached, self.ttls.payment_method)
            .await
    }

    pub async fn invalidate_payment_method(&self, id: u64) -> Result<(), CacheError> {
        self.store
            .delete(&[payment_method_key(id), ALL_PAYMENT_METHODS_KEY.to_string()])
            .await
    }

    pub async fn get_restaurant(&self, id: u64) -> Option<CachedRestaurant> {
        self.store.get_json(&restaurant_key(id)).await
    }

    pub async fn set_restaurant(&self, restaurant: &Restaurant) -> Result<(), CacheError> {
        self.store
            .set_json(
                &restaurant_key(restaurant.id),
                &CachedRestaurant::from(restaurant),
                self.ttls.restaurant,
            )
            .await
    }

    pub async fn invalidate_restaurant(&self, id: u64) -> Result<(), CacheError> {
        self.store
            .delete(&[restaurant_key(id), ALL_RESTAURANTS_KEY.to_string()])
            .await
    }
}
