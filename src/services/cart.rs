//! Session cart operations.
//!
//! Stock is only checked here, never changed; it is decremented at checkout.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::aggregates::{Cart, CartView};
use crate::domain::value_objects::SessionKey;
use crate::error::{Result, ShopError};
use crate::storage::Store;

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn Store>,
}

impl CartService {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    async fn cart(&self, session: &SessionKey) -> Result<Cart> {
        self.store.get_or_create_cart(session.as_str()).await
    }

    async fn view_of(&self, cart: &Cart) -> Result<CartView> {
        let lines = self.store.cart_lines(cart.id).await?;
        Ok(CartView::new(cart, lines))
    }

    pub async fn view(&self, session: &SessionKey) -> Result<CartView> {
        let cart = self.cart(session).await?;
        self.view_of(&cart).await
    }

    /// Adds to the existing line for the product, or opens a new one.
    #[instrument(skip(self, session))]
    pub async fn add(&self, session: &SessionKey, product_id: i64, quantity: i32) -> Result<CartView> {
        if quantity < 1 { return Err(ShopError::InvalidQuantity); }
        let cart = self.cart(session).await?;
        let product = self.store.active_product(product_id).await?.ok_or(ShopError::PRODUCT_NOT_FOUND)?;
        if !product.has_stock_for(quantity) { return Err(ShopError::InsufficientStock(product.name)); }
        if !self.store.add_to_cart(cart.id, product.id, quantity).await? {
            return Err(ShopError::InsufficientStock(product.name));
        }
        debug!(cart_id = cart.id, "added to cart");
        self.view_of(&cart).await
    }

    /// A non-positive quantity removes the line.
    #[instrument(skip(self, session))]
    pub async fn update(&self, session: &SessionKey, item_id: i64, quantity: i32) -> Result<CartView> {
        let cart = self.cart(session).await?;
        let line = self.store.cart_line(cart.id, item_id).await?.ok_or(ShopError::ITEM_NOT_FOUND)?;
        if !line.product.has_stock_for(quantity) { return Err(ShopError::InsufficientStock(line.product.name)); }
        if quantity <= 0 {
            self.store.remove_line(cart.id, item_id).await?;
        } else {
            self.store.set_line_quantity(cart.id, item_id, quantity).await?;
        }
        self.view_of(&cart).await
    }

    #[instrument(skip(self, session))]
    pub async fn remove(&self, session: &SessionKey, item_id: i64) -> Result<CartView> {
        let cart = self.cart(session).await?;
        if !self.store.remove_line(cart.id, item_id).await? { return Err(ShopError::ITEM_NOT_FOUND); }
        self.view_of(&cart).await
    }

    pub async fn clear(&self, session: &SessionKey) -> Result<CartView> {
        let cart = self.cart(session).await?;
        self.store.clear_cart(cart.id).await?;
        self.view_of(&cart).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::NewProduct;
    use crate::storage::MemoryStore;
    use rust_decimal::Decimal;

    async fn setup() -> (Arc<MemoryStore>, CartService, SessionKey) {
        let store = Arc::new(MemoryStore::new());
        let service = CartService::new(store.clone());
        (store, service, SessionKey::new("shopper-1").unwrap())
    }

    #[tokio::test]
    async fn test_adding_twice_accumulates() {
        let (store, carts, session) = setup().await;
        let p = store.add_product(NewProduct::new("Mascara", Decimal::new(35000, 2), 10)).await;
        carts.add(&session, p.id, 2).await.unwrap();
        let view = carts.add(&session, p.id, 3).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 5);
        assert_eq!(view.total, Decimal::new(175000, 2));
        assert_eq!(view.total_items, 5);
    }

    #[tokio::test]
    async fn test_add_rejects_more_than_stock() {
        let (store, carts, session) = setup().await;
        let p = store.add_product(NewProduct::new("Primer", Decimal::from(800), 2)).await;
        let err = carts.add(&session, p.id, 3).await.unwrap_err();
        assert!(matches!(err, ShopError::InsufficientStock(ref name) if name == "Primer"));
        assert_eq!(store.product(p.id).await.unwrap().stock, 2);
        assert!(carts.view(&session).await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn test_add_cannot_push_line_past_max_quantity() {
        let (store, carts, session) = setup().await;
        let p = store.add_product(NewProduct::new("Cotton Pads", Decimal::from(5), i32::MAX)).await;
        carts.add(&session, p.id, i32::MAX).await.unwrap();
        let err = carts.add(&session, p.id, 1).await.unwrap_err();
        assert!(matches!(err, ShopError::InsufficientStock(ref name) if name == "Cotton Pads"));
        assert_eq!(carts.view(&session).await.unwrap().items[0].quantity, i32::MAX);
    }

    #[tokio::test]
    async fn test_add_unknown_or_inactive_product() {
        let (store, carts, session) = setup().await;
        let hidden = store.add_product(NewProduct::new("Retired", Decimal::from(10), 5).inactive()).await;
        assert!(matches!(carts.add(&session, 999, 1).await, Err(ShopError::NotFound(_))));
        assert!(matches!(carts.add(&session, hidden.id, 1).await, Err(ShopError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_add_rejects_non_positive_quantity() {
        let (store, carts, session) = setup().await;
        let p = store.add_product(NewProduct::new("Gloss", Decimal::from(10), 5)).await;
        assert!(matches!(carts.add(&session, p.id, 0).await, Err(ShopError::InvalidQuantity)));
    }

    #[tokio::test]
    async fn test_update_sets_or_removes() {
        let (store, carts, session) = setup().await;
        let a = store.add_product(NewProduct::new("A", Decimal::from(10), 10)).await;
        let b = store.add_product(NewProduct::new("B", Decimal::from(20), 10)).await;
        carts.add(&session, a.id, 1).await.unwrap();
        let view = carts.add(&session, b.id, 1).await.unwrap();
        let (item_a, item_b) = (view.items[0].id, view.items[1].id);

        let view = carts.update(&session, item_a, 4).await.unwrap();
        assert_eq!(view.items[0].quantity, 4);

        let view = carts.update(&session, item_a, 0).await.unwrap();
        assert_eq!(view.items.len(), 1);
        let view = carts.update(&session, item_b, -1).await.unwrap();
        assert!(view.items.is_empty());
    }

    #[tokio::test]
    async fn test_update_checks_stock_and_ownership() {
        let (store, carts, session) = setup().await;
        let p = store.add_product(NewProduct::new("Cleanser", Decimal::from(10), 3)).await;
        let item = carts.add(&session, p.id, 1).await.unwrap().items[0].id;
        assert!(matches!(carts.update(&session, item, 4).await, Err(ShopError::InsufficientStock(_))));
        assert_eq!(carts.view(&session).await.unwrap().items[0].quantity, 1);

        let stranger = SessionKey::new("someone-else").unwrap();
        assert!(matches!(carts.update(&stranger, item, 2).await, Err(ShopError::NotFound(_))));
        assert!(matches!(carts.remove(&stranger, item).await, Err(ShopError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let (store, carts, session) = setup().await;
        let p = store.add_product(NewProduct::new("Toner", Decimal::from(10), 3)).await;
        let item = carts.add(&session, p.id, 1).await.unwrap().items[0].id;
        assert!(carts.remove(&session, item).await.unwrap().items.is_empty());
        assert!(matches!(carts.remove(&session, item).await, Err(ShopError::NotFound(_))));

        carts.add(&session, p.id, 2).await.unwrap();
        let view = carts.clear(&session).await.unwrap();
        assert!(view.items.is_empty());
        let again = carts.clear(&session).await.unwrap();
        assert!(again.items.is_empty());
        assert_eq!(again.total, Decimal::ZERO);
        assert_eq!(again.id, view.id);
    }
}
