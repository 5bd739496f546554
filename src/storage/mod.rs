//! Storage implementations.
//!
//! Services talk to a [`Store`]; the checkout flow additionally opens a
//! [`CheckoutTransaction`] so that order creation, stock decrement and cart
//! clearing become visible together or not at all.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::config::Config;
use crate::domain::aggregates::{Cart, CartLine, Category, NewOrder, NewOrderItem, Order, OrderItem, Product};
use crate::error::Result;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Active products, newest first, optionally restricted to one category.
    async fn list_products(&self, category_id: Option<i64>) -> Result<Vec<Product>>;

    async fn active_product(&self, id: i64) -> Result<Option<Product>>;

    /// Idempotent lookup-or-initialize of the cart owned by `session_key`.
    async fn get_or_create_cart(&self, session_key: &str) -> Result<Cart>;

    async fn find_cart(&self, session_key: &str) -> Result<Option<Cart>>;

    /// Lines of a cart in insertion order.
    async fn cart_lines(&self, cart_id: i64) -> Result<Vec<CartLine>>;

    async fn cart_line(&self, cart_id: i64, item_id: i64) -> Result<Option<CartLine>>;

    /// Adds `quantity` to the line for `product_id`, creating it if absent.
    /// Returns false, leaving the line untouched, when the sum would not fit a line quantity.
    async fn add_to_cart(&self, cart_id: i64, product_id: i64, quantity: i32) -> Result<bool>;

    async fn set_line_quantity(&self, cart_id: i64, item_id: i64, quantity: i32) -> Result<()>;

    /// Returns false when the item does not belong to the cart.
    async fn remove_line(&self, cart_id: i64, item_id: i64) -> Result<bool>;

    async fn clear_cart(&self, cart_id: i64) -> Result<()>;

    async fn order(&self, id: i64) -> Result<Option<Order>>;

    /// All orders, newest first.
    async fn orders(&self) -> Result<Vec<Order>>;

    async fn begin_checkout(&self) -> Result<Box<dyn CheckoutTransaction>>;
}

/// Unit of work for one checkout. Dropping it without [`commit`](Self::commit) rolls back.
#[async_trait]
pub trait CheckoutTransaction: Send {
    /// Cart lines with their product rows locked until the transaction ends.
    async fn lock_cart_lines(&mut self, cart_id: i64) -> Result<Vec<CartLine>>;

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order>;

    async fn insert_order_item(&mut self, order_id: i64, item: &NewOrderItem) -> Result<OrderItem>;

    /// Decrements stock only if enough remains; returns whether it did.
    async fn take_stock(&mut self, product_id: i64, quantity: i32) -> Result<bool>;

    async fn clear_cart(&mut self, cart_id: i64) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Picks the backend from configuration.
pub async fn init_store(config: &Config) -> Result<Arc<dyn Store>> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(config.max_connections).connect(url).await?;
            let store = PostgresStore::new(pool);
            store.migrate().await?;
            info!("Storage: postgres ({} connections)", config.max_connections);
            Ok(Arc::new(store))
        }
        None => {
            info!("Storage: in-memory with demo catalog (set DATABASE_URL for postgres)");
            Ok(Arc::new(MemoryStore::with_demo_catalog().await))
        }
    }
}
