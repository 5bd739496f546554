//! Catalog: products and categories

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    #[serde(rename = "category")]
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Whether `quantity` units can be taken from the current stock.
    pub fn has_stock_for(&self, quantity: i32) -> bool { self.stock >= quantity }
}

/// Fields needed to register a product with a store backend.
#[derive(Clone, Debug)]
pub struct NewProduct {
    pub category_id: Option<i64>,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub image: Option<String>,
    pub is_active: bool,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: Decimal, stock: i32) -> Self {
        Self { category_id: None, name: name.into(), description: String::new(), price, stock, image: None, is_active: true }
    }

    pub fn in_category(mut self, category_id: i64) -> Self { self.category_id = Some(category_id); self }
    pub fn inactive(mut self) -> Self { self.is_active = false; self }
}

pub fn slugify(name: &str) -> String {
    name.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}
