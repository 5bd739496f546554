//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use crate::domain::aggregates::Product;
use crate::domain::value_objects::{line_total, money};

/// A session-scoped cart. Created lazily on first use, never deleted.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Cart {
    pub id: i64,
    pub session_key: String,
    pub created_at: DateTime<Utc>,
}

/// One (product, quantity) pairing in a cart, joined with the live product row.
#[derive(Clone, Debug, PartialEq)]
pub struct CartLine {
    pub item_id: i64,
    pub quantity: i32,
    pub product: Product,
}

impl CartLine {
    pub fn subtotal(&self) -> Decimal { line_total(self.product.price, self.quantity) }
    pub fn is_short(&self) -> bool { !self.product.has_stock_for(self.quantity) }
}

pub fn cart_total(lines: &[CartLine]) -> Decimal {
    money(lines.iter().map(CartLine::subtotal).sum())
}

pub fn cart_item_count(lines: &[CartLine]) -> i64 {
    lines.iter().map(|l| i64::from(l.quantity)).sum()
}

/// First line whose quantity exceeds the product's current stock.
pub fn first_short_line(lines: &[CartLine]) -> Option<&CartLine> {
    lines.iter().find(|l| l.is_short())
}

#[derive(Clone, Debug, Serialize)]
pub struct CartItemView {
    pub id: i64,
    pub product: Product,
    pub quantity: i32,
    pub subtotal: Decimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct CartView {
    pub id: i64,
    pub items: Vec<CartItemView>,
    pub total: Decimal,
    pub total_items: i64,
}

impl CartView {
    pub fn new(cart: &Cart, lines: Vec<CartLine>) -> Self {
        let total = cart_total(&lines);
        let total_items = cart_item_count(&lines);
        let items = lines.into_iter().map(|l| CartItemView { id: l.item_id, subtotal: l.subtotal(), quantity: l.quantity, product: l.product }).collect();
        Self { id: cart.id, items, total, total_items }
    }
}
