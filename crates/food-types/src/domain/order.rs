use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::business::{Address, PaymentMethod, Restaurant};
use super::user::User;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    Confirmed,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Created,
        OrderStatus::Confirmed,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Created -> {Confirmed, Cancelled}, Confirmed -> {Delivered, Cancelled}.
    pub fn can_transition_to(self, target: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, target),
            (Created, Confirmed) | (Created, Cancelled) | (Confirmed, Delivered) | (Confirmed, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Statuses counted in sales figures.
    pub fn is_sale(self) -> bool {
        matches!(self, OrderStatus::Confirmed | OrderStatus::Delivered)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            OrderStatus::Created => "Created",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Rejected state-machine move; the order is left untouched.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("order status cannot change from {current} to {target}")]
pub struct InvalidTransition {
    pub current: OrderStatus,
    pub target: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub product_id: u64,
    #[serde(default)]
    pub product_name: String,
    pub quantity: u32,
    /// Price captured when the order was placed.
    pub unit_price: Decimal,
    pub total_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl OrderItem {
    pub fn new(
        product_id: u64,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
    ) -> Self {
        let mut item = Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
            total_price: Decimal::ZERO,
            note: None,
        };
        item.compute_total();
        item
    }

    pub fn compute_total(&mut self) {
        self.total_price = self.unit_price * Decimal::from(self.quantity);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Store key; `0` until the order has been persisted.
    pub id: u64,
    pub code: String,
    pub subtotal: Decimal,
    pub freight_fee: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    pub restaurant_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant: Option<Restaurant>,
    pub client_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<User>,
    pub payment_method_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub delivery_address: Address,
    pub items: Vec<OrderItem>,
}

impl Order {
    pub fn new(
        restaurant_id: u64,
        client_id: u64,
        payment_method_id: u64,
        delivery_address: Address,
        items: Vec<OrderItem>,
    ) -> Self {
        Self {
            id: 0,
            code: String::new(),
            subtotal: Decimal::ZERO,
            freight_fee: Decimal::ZERO,
            total: Decimal::ZERO,
            status: OrderStatus::Created,
            created_at: stamp(),
            confirmed_at: None,
            cancelled_at: None,
            delivered_at: None,
            restaurant_id,
            restaurant: None,
            client_id,
            client: None,
            payment_method_id,
            payment_method: None,
            delivery_address,
            items,
        }
    }

    pub fn set_freight(&mut self, freight_fee: Decimal) {
        self.freight_fee = freight_fee;
    }

    pub fn compute_totals(&mut self) {
        self.subtotal = Decimal::ZERO;
        for item in &mut self.items {
            item.compute_total();
            self.subtotal += item.total_price;
        }
        self.total = self.subtotal + self.freight_fee;
    }

    /// Gives the order its public code. A code that is already set is kept.
    pub fn assign_code(&mut self) -> &str {
        if self.code.is_empty() {
            self.code = Uuid::new_v4().to_string();
        }
        &self.code
    }

    pub fn confirm(&mut self) -> Result<(), InvalidTransition> {
        let now = self.transition_to(OrderStatus::Confirmed)?;
        self.confirmed_at = Some(now);
        Ok(())
    }

    pub fn deliver(&mut self) -> Result<(), InvalidTransition> {
        let now = self.transition_to(OrderStatus::Delivered)?;
        self.delivered_at = Some(now);
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), InvalidTransition> {
        let now = self.transition_to(OrderStatus::Cancelled)?;
        self.cancelled_at = Some(now);
        Ok(())
    }

    pub fn can_be_confirmed(&self) -> bool {
        self.status.can_transition_to(OrderStatus::Confirmed)
    }

    pub fn can_be_delivered(&self) -> bool {
        self.status.can_transition_to(OrderStatus::Delivered)
    }

    pub fn can_be_cancelled(&self) -> bool {
        self.status.can_transition_to(OrderStatus::Cancelled)
    }

    /// Timestamp stamped by the transition that produced the current status.
    pub fn transitioned_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            OrderStatus::Created => None,
            OrderStatus::Confirmed => self.confirmed_at,
            OrderStatus::Delivered => self.delivered_at,
            OrderStatus::Cancelled => self.cancelled_at,
        }
    }

    fn transition_to(&mut self, target: OrderStatus) -> Result<DateTime<Utc>, InvalidTransition> {
        if !self.status.can_transition_to(target) {
            return Err(InvalidTransition {
                current: self.status,
                target,
            });
        }
        self.status = target;
        Ok(stamp())
    }
}

/// Current time at the microsecond precision every order store keeps.
pub fn stamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Input for placing an order. Prices and names come from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewOrder {
    pub restaurant_id: u64,
    pub client_id: u64,
    pub payment_method_id: u64,
    #[serde(default)]
    pub delivery_address: Address,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewOrderItem {
    pub product_id: u64,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}
