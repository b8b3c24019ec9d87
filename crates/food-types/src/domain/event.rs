use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::{Order, OrderStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OrderEventKind {
    OrderConfirmed,
    OrderCancelled,
    OrderDelivered,
}

impl OrderEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderEventKind::OrderConfirmed => "OrderConfirmed",
            OrderEventKind::OrderCancelled => "OrderCancelled",
            OrderEventKind::OrderDelivered => "OrderDelivered",
        }
    }

    /// Event produced by entering `status`; `Created` has none.
    pub fn for_status(status: OrderStatus) -> Option<Self> {
        match status {
            OrderStatus::Created => None,
            OrderStatus::Confirmed => Some(OrderEventKind::OrderConfirmed),
            OrderStatus::Cancelled => Some(OrderEventKind::OrderCancelled),
            OrderStatus::Delivered => Some(OrderEventKind::OrderDelivered),
        }
    }
}

/// Emitted once per successful lifecycle transition. Never mutated after build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderEvent {
    pub kind: OrderEventKind,
    pub order_code: String,
    pub client_id: u64,
    pub client_name: String,
    pub client_email: String,
    pub restaurant_id: u64,
    pub restaurant_name: String,
    pub total: Decimal,
    pub transitioned_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

impl OrderEvent {
    /// Builds the event for the transition the order just went through.
    /// Returns `None` for an order that has not left `Created`.
    pub fn from_transition(order: &Order) -> Option<Self> {
        let kind = OrderEventKind::for_status(order.status)?;
        let transitioned_at = order.transitioned_at()?;
        let (client_name, client_email) = order
            .client
            .as_ref()
            .map(|c| (c.name.clone(), c.email.clone()))
            .unwrap_or_default();
        let restaurant_name = order
            .restaurant
            .as_ref()
            .map(|r| r.name.clone())
            .unwrap_or_default();
        Some(Self {
            kind,
            order_code: order.code.clone(),
            client_id: order.client_id,
            client_name,
            client_email,
            restaurant_id: order.restaurant_id,
            restaurant_name,
            total: order.total,
            transitioned_at,
            occurred_at: Utc::now(),
        })
    }

    pub fn event_type(&self) -> &'static str {
        self.kind.as_str()
    }
}
