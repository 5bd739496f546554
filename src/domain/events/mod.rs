//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use crate::domain::aggregates::Order;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: i64, total_amount: Decimal, shipping_cost: Decimal, items: usize, placed_at: chrono::DateTime<chrono::Utc> },
}

impl DomainEvent {
    pub fn order_placed(order: &Order) -> Self {
        DomainEvent::Order(OrderEvent::Placed {
            order_id: order.id,
            total_amount: order.total_amount,
            shipping_cost: order.shipping_cost,
            items: order.items.len(),
            placed_at: order.created_at,
        })
    }

    /// Subject the event is published under.
    pub fn subject(&self) -> &'static str {
        match self {
            DomainEvent::Order(OrderEvent::Placed { .. }) => "order.placed",
        }
    }
}
