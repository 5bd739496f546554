//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use crate::domain::aggregates::CartLine;
use crate::domain::value_objects::{line_total, money};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Confirmed, Processing, Shipped, Delivered, Cancelled }

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [Self::Pending, Self::Confirmed, Self::Processing, Self::Shipped, Self::Delivered, Self::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending", Self::Confirmed => "confirmed", Self::Processing => "processing",
            Self::Shipped => "shipped", Self::Delivered => "delivered", Self::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending", Self::Confirmed => "Confirmed", Self::Processing => "Processing",
            Self::Shipped => "Shipped", Self::Delivered => "Delivered", Self::Cancelled => "Cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownChoice;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|v| v.as_str() == s).ok_or_else(|| UnknownChoice(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod { #[default] Cod, Bkash, Nagad, Card }

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [Self::Cod, Self::Bkash, Self::Nagad, Self::Card];

    pub fn as_str(&self) -> &'static str {
        match self { Self::Cod => "cod", Self::Bkash => "bkash", Self::Nagad => "nagad", Self::Card => "card" }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cod => "Cash on Delivery", Self::Bkash => "bKash", Self::Nagad => "Nagad", Self::Card => "Credit/Debit Card",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = UnknownChoice;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|v| v.as_str() == s).ok_or_else(|| UnknownChoice(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a valid choice.")]
pub struct UnknownChoice(pub String);

/// Customer and shipping details captured at checkout.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CustomerDetails {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    pub city: String,
    pub postal_code: String,
    pub payment_method: PaymentMethod,
    pub note: String,
}

/// Header row written at the start of the checkout transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOrder {
    pub customer: CustomerDetails,
    pub total_amount: Decimal,
    pub shipping_cost: Decimal,
}

/// Frozen copy of a cart line: name and price are taken from the product at order time.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub product_name: String,
    pub product_price: Decimal,
    pub quantity: i32,
}

impl NewOrderItem {
    pub fn snapshot(line: &CartLine) -> Self {
        Self {
            product_id: line.product.id,
            product_name: line.product.name.clone(),
            product_price: line.product.price,
            quantity: line.quantity,
        }
    }
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    /// Cleared when the product is deleted from the catalog.
    pub product_id: Option<i64>,
    pub product_name: String,
    pub product_price: Decimal,
    pub quantity: i32,
}

impl OrderItem {
    pub fn subtotal(&self) -> Decimal { line_total(self.product_price, self.quantity) }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub id: i64,
    pub customer: CustomerDetails,
    pub total_amount: Decimal,
    pub shipping_cost: Decimal,
    pub status: OrderStatus,
    pub is_paid: bool,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Not stored; always derived from the two persisted amounts.
    pub fn grand_total(&self) -> Decimal { money(self.total_amount + self.shipping_cost) }

    pub fn tracking(&self) -> OrderTracking {
        OrderTracking {
            order_id: self.id, status: self.status, status_display: self.status.label(),
            is_paid: self.is_paid, created_at: self.created_at, updated_at: self.updated_at,
        }
    }

    pub fn view(&self) -> OrderView {
        let c = &self.customer;
        OrderView {
            id: self.id,
            customer_name: c.customer_name.clone(),
            customer_email: c.customer_email.clone(),
            customer_phone: c.customer_phone.clone(),
            shipping_address: c.shipping_address.clone(),
            city: c.city.clone(),
            postal_code: c.postal_code.clone(),
            total_amount: self.total_amount,
            shipping_cost: self.shipping_cost,
            grand_total: self.grand_total(),
            status: self.status,
            status_display: self.status.label(),
            payment_method: c.payment_method,
            payment_method_display: c.payment_method.label(),
            is_paid: self.is_paid,
            note: c.note.clone(),
            items: self.items.iter().map(|i| OrderItemView {
                id: i.id, product: i.product_id, product_name: i.product_name.clone(),
                product_price: i.product_price, quantity: i.quantity, subtotal: i.subtotal(),
            }).collect(),
            created_at: self.created_at,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderItemView {
    pub id: i64,
    pub product: Option<i64>,
    pub product_name: String,
    pub product_price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderView {
    pub id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    pub city: String,
    pub postal_code: String,
    pub total_amount: Decimal,
    pub shipping_cost: Decimal,
    pub grand_total: Decimal,
    pub status: OrderStatus,
    pub status_display: &'static str,
    pub payment_method: PaymentMethod,
    pub payment_method_display: &'static str,
    pub is_paid: bool,
    pub note: String,
    pub items: Vec<OrderItemView>,
    pub created_at: DateTime<Utc>,
}

/// Lightweight status view for customers following an order.
#[derive(Clone, Debug, Serialize)]
pub struct OrderTracking {
    pub order_id: i64,
    pub status: OrderStatus,
    pub status_display: &'static str,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
