//! Order lookup and tracking. Read-only.

use std::sync::Arc;

use crate::domain::aggregates::{Order, OrderTracking};
use crate::error::{Result, ShopError};
use crate::storage::Store;

#[derive(Clone)]
pub struct OrderLookup {
    store: Arc<dyn Store>,
}

impl OrderLookup {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    pub async fn get(&self, id: i64) -> Result<Order> {
        self.store.order(id).await?.ok_or(ShopError::ORDER_NOT_FOUND)
    }

    pub async fn list(&self) -> Result<Vec<Order>> { self.store.orders().await }

    pub async fn track(&self, id: i64) -> Result<OrderTracking> {
        Ok(self.get(id).await?.tracking())
    }
}
