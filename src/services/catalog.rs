//! Read-only catalog queries.

use std::sync::Arc;

use crate::domain::aggregates::{Category, Product};
use crate::error::{Result, ShopError};
use crate::storage::Store;

#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn Store>,
}

impl Catalog {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    pub async fn categories(&self) -> Result<Vec<Category>> { self.store.list_categories().await }

    pub async fn products(&self) -> Result<Vec<Product>> { self.store.list_products(None).await }

    pub async fn products_in_category(&self, category_id: i64) -> Result<Vec<Product>> {
        self.store.list_products(Some(category_id)).await
    }

    pub async fn product(&self, id: i64) -> Result<Product> {
        self.store.active_product(id).await?.ok_or(ShopError::PRODUCT_NOT_FOUND)
    }
}
