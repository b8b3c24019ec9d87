use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::location::City;
use super::user::User;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cuisine {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentMethod {
    pub id: u64,
    pub description: String,
}

/// Street address shared by restaurants and order deliveries.
///
/// `city_id` is the stored reference; `city` is only present once it has
/// been resolved through a lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub complement: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub city_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<City>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Restaurant {
    pub id: u64,
    pub name: String,
    pub freight_rate: Decimal,
    pub cuisine: Cuisine,
    #[serde(default)]
    pub address: Option<Address>,
    pub active: bool,
    pub open: bool,
    #[serde(default)]
    pub payment_methods: Vec<PaymentMethod>,
    #[serde(default)]
    pub responsibles: Vec<User>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Restaurant {
    pub fn new(name: impl Into<String>, freight_rate: Decimal, cuisine: Cuisine) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: name.into(),
            freight_rate,
            cuisine,
            address: None,
            active: true,
            open: false,
            payment_methods: Vec::new(),
            responsibles: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn accepts_payment_method(&self, payment_method: &PaymentMethod) -> bool {
        self.payment_methods
            .iter()
            .any(|accepted| accepted.id == payment_method.id)
    }

    pub fn activate(&mut self) {
        self.active = true;
        self.touch();
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.touch();
    }

    pub fn open(&mut self) {
        self.open = true;
        self.touch();
    }

    pub fn close(&mut self) {
        self.open = false;
        self.touch();
    }

    pub fn city_id(&self) -> Option<u64> {
        self.address.as_ref().and_then(|a| a.city_id)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: u64,
    pub restaurant_id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub active: bool,
}
