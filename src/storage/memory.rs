//! In-memory Store used by tests and local development.
//!
//! A checkout transaction holds the state lock for its whole lifetime and
//! works on a private copy, which replaces the shared state on commit.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::domain::aggregates::product::slugify;
use crate::domain::aggregates::{Cart, CartLine, Category, NewOrder, NewOrderItem, NewProduct, Order, OrderItem, OrderStatus, Product};
use crate::error::{Result, ShopError};
use crate::storage::{CheckoutTransaction, Store};

#[derive(Clone, Debug)]
struct CartItemRow { id: i64, cart_id: i64, product_id: i64, quantity: i32 }

#[derive(Clone, Debug, Default)]
struct State {
    next_id: i64,
    categories: BTreeMap<i64, Category>,
    products: BTreeMap<i64, Product>,
    carts: BTreeMap<i64, Cart>,
    cart_items: BTreeMap<i64, CartItemRow>,
    orders: BTreeMap<i64, Order>,
}

impl State {
    fn next_id(&mut self) -> i64 { self.next_id += 1; self.next_id }

    fn with_category_name(&self, product: &Product) -> Product {
        let mut p = product.clone();
        p.category_name = p.category_id.and_then(|id| self.categories.get(&id)).map(|c| c.name.clone());
        p
    }

    fn line(&self, row: &CartItemRow) -> Option<CartLine> {
        let product = self.products.get(&row.product_id)?;
        Some(CartLine { item_id: row.id, quantity: row.quantity, product: self.with_category_name(product) })
    }

    fn lines(&self, cart_id: i64) -> Vec<CartLine> {
        self.cart_items.values().filter(|r| r.cart_id == cart_id).filter_map(|r| self.line(r)).collect()
    }

    fn clear_cart(&mut self, cart_id: i64) { self.cart_items.retain(|_, r| r.cart_id != cart_id); }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    fail_on_cart_clear: RwLock<bool>,
    sale_before_checkout: RwLock<Option<(i64, i32)>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// A handful of products so a fresh dev server has something to sell.
    pub async fn with_demo_catalog() -> Self {
        let store = Self::new();
        let makeup = store.add_category("Makeup").await;
        let skin = store.add_category("Skin Care").await;
        store.add_product(NewProduct::new("Matte Lipstick", Decimal::new(45000, 2), 25).in_category(makeup.id)).await;
        store.add_product(NewProduct::new("Kajal Pencil", Decimal::new(18000, 2), 40).in_category(makeup.id)).await;
        store.add_product(NewProduct::new("Vitamin C Serum", Decimal::new(120000, 2), 10).in_category(skin.id)).await;
        store
    }

    /// Makes the final step of the next checkouts fail, to exercise rollback.
    pub async fn set_fail_on_cart_clear(&self, fail: bool) {
        *self.fail_on_cart_clear.write().await = fail;
    }

    /// Sells `quantity` of a product to someone else just before the next
    /// checkout takes its lock, after that checkout's stock pre-check.
    pub async fn sell_before_next_checkout(&self, product_id: i64, quantity: i32) {
        *self.sale_before_checkout.write().await = Some((product_id, quantity));
    }

    pub async fn add_category(&self, name: &str) -> Category {
        let mut state = self.state.lock().await;
        let category = Category { id: state.next_id(), name: name.to_string(), slug: slugify(name), description: String::new() };
        state.categories.insert(category.id, category.clone());
        category
    }

    pub async fn add_product(&self, new: NewProduct) -> Product {
        let mut state = self.state.lock().await;
        let product = Product {
            id: state.next_id(), category_id: new.category_id, category_name: None, name: new.name, description: new.description,
            price: new.price, stock: new.stock, image: new.image, is_active: new.is_active, created_at: Utc::now(),
        };
        state.products.insert(product.id, product.clone());
        state.with_category_name(&product)
    }

    /// Any product, active or not.
    pub async fn product(&self, id: i64) -> Option<Product> {
        let state = self.state.lock().await;
        state.products.get(&id).map(|p| state.with_category_name(p))
    }

    pub async fn update_product(&self, id: i64, edit: impl FnOnce(&mut Product) + Send) -> Option<Product> {
        let mut state = self.state.lock().await;
        let product = state.products.get_mut(&id)?;
        edit(product);
        Some(product.clone())
    }

    /// Removes a product; order lines keep their snapshot but lose the reference.
    pub async fn delete_product(&self, id: i64) -> bool {
        let mut state = self.state.lock().await;
        if state.products.remove(&id).is_none() { return false; }
        state.cart_items.retain(|_, r| r.product_id != id);
        for item in state.orders.values_mut().flat_map(|o| o.items.iter_mut()) {
            if item.product_id == Some(id) { item.product_id = None; }
        }
        true
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let state = self.state.lock().await;
        let mut categories: Vec<Category> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn list_products(&self, category_id: Option<i64>) -> Result<Vec<Product>> {
        let state = self.state.lock().await;
        Ok(state.products.values().rev()
            .filter(|p| p.is_active && category_id.map_or(true, |c| p.category_id == Some(c)))
            .map(|p| state.with_category_name(p))
            .collect())
    }

    async fn active_product(&self, id: i64) -> Result<Option<Product>> {
        let state = self.state.lock().await;
        Ok(state.products.get(&id).filter(|p| p.is_active).map(|p| state.with_category_name(p)))
    }

    async fn get_or_create_cart(&self, session_key: &str) -> Result<Cart> {
        let mut state = self.state.lock().await;
        if let Some(cart) = state.carts.values().find(|c| c.session_key == session_key) {
            return Ok(cart.clone());
        }
        let cart = Cart { id: state.next_id(), session_key: session_key.to_string(), created_at: Utc::now() };
        state.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn find_cart(&self, session_key: &str) -> Result<Option<Cart>> {
        let state = self.state.lock().await;
        Ok(state.carts.values().find(|c| c.session_key == session_key).cloned())
    }

    async fn cart_lines(&self, cart_id: i64) -> Result<Vec<CartLine>> {
        Ok(self.state.lock().await.lines(cart_id))
    }

    async fn cart_line(&self, cart_id: i64, item_id: i64) -> Result<Option<CartLine>> {
        let state = self.state.lock().await;
        Ok(state.cart_items.get(&item_id).filter(|r| r.cart_id == cart_id).and_then(|r| state.line(r)))
    }

    async fn add_to_cart(&self, cart_id: i64, product_id: i64, quantity: i32) -> Result<bool> {
        let mut state = self.state.lock().await;
        if let Some(row) = state.cart_items.values_mut().find(|r| r.cart_id == cart_id && r.product_id == product_id) {
            return Ok(match row.quantity.checked_add(quantity) {
                Some(sum) => { row.quantity = sum; true }
                None => false,
            });
        }
        let id = state.next_id();
        state.cart_items.insert(id, CartItemRow { id, cart_id, product_id, quantity });
        Ok(true)
    }

    async fn set_line_quantity(&self, cart_id: i64, item_id: i64, quantity: i32) -> Result<()> {
        let mut state = self.state.lock().await;
        match state.cart_items.get_mut(&item_id).filter(|r| r.cart_id == cart_id) {
            Some(row) => { row.quantity = quantity; Ok(()) }
            None => Err(ShopError::ITEM_NOT_FOUND),
        }
    }

    async fn remove_line(&self, cart_id: i64, item_id: i64) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.cart_items.get(&item_id).map_or(false, |r| r.cart_id == cart_id) {
            state.cart_items.remove(&item_id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn clear_cart(&self, cart_id: i64) -> Result<()> {
        self.state.lock().await.clear_cart(cart_id);
        Ok(())
    }

    async fn order(&self, id: i64) -> Result<Option<Order>> {
        Ok(self.state.lock().await.orders.get(&id).cloned())
    }

    async fn orders(&self) -> Result<Vec<Order>> {
        Ok(self.state.lock().await.orders.values().rev().cloned().collect())
    }

    async fn begin_checkout(&self) -> Result<Box<dyn CheckoutTransaction>> {
        let fail_on_cart_clear = *self.fail_on_cart_clear.read().await;
        let mut guard = self.state.clone().lock_owned().await;
        if let Some((product_id, quantity)) = self.sale_before_checkout.write().await.take() {
            if let Some(p) = guard.products.get_mut(&product_id) { p.stock -= quantity; }
        }
        let work = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, work, fail_on_cart_clear }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<State>,
    work: State,
    fail_on_cart_clear: bool,
}

#[async_trait]
impl CheckoutTransaction for MemoryTransaction {
    async fn lock_cart_lines(&mut self, cart_id: i64) -> Result<Vec<CartLine>> {
        Ok(self.work.lines(cart_id))
    }

    async fn insert_order(&mut self, new: &NewOrder) -> Result<Order> {
        let now = Utc::now();
        let order = Order {
            id: self.work.next_id(), customer: new.customer.clone(), total_amount: new.total_amount, shipping_cost: new.shipping_cost,
            status: OrderStatus::Pending, is_paid: false, items: vec![], created_at: now, updated_at: now,
        };
        self.work.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn insert_order_item(&mut self, order_id: i64, new: &NewOrderItem) -> Result<OrderItem> {
        let id = self.work.next_id();
        let order = self.work.orders.get_mut(&order_id).ok_or(ShopError::ORDER_NOT_FOUND)?;
        let item = OrderItem {
            id, order_id, product_id: Some(new.product_id), product_name: new.product_name.clone(),
            product_price: new.product_price, quantity: new.quantity,
        };
        order.items.push(item.clone());
        Ok(item)
    }

    async fn take_stock(&mut self, product_id: i64, quantity: i32) -> Result<bool> {
        match self.work.products.get_mut(&product_id) {
            Some(p) if p.stock >= quantity => { p.stock -= quantity; Ok(true) }
            _ => Ok(false),
        }
    }

    async fn clear_cart(&mut self, cart_id: i64) -> Result<()> {
        if self.fail_on_cart_clear { return Err(ShopError::Storage("injected failure while clearing cart".into())); }
        self.work.clear_cart(cart_id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction { mut guard, work, .. } = *self;
        *guard = work;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cart_is_created_once_per_session() {
        let store = MemoryStore::new();
        let a = store.get_or_create_cart("s1").await.unwrap();
        let again = store.get_or_create_cart("s1").await.unwrap();
        let other = store.get_or_create_cart("s2").await.unwrap();
        assert_eq!(a.id, again.id);
        assert_ne!(a.id, other.id);
        assert!(store.find_cart("s3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_merges_lines() {
        let store = MemoryStore::new();
        let p = store.add_product(NewProduct::new("Blush", Decimal::from(300), 10)).await;
        let cart = store.get_or_create_cart("s").await.unwrap();
        store.add_to_cart(cart.id, p.id, 2).await.unwrap();
        store.add_to_cart(cart.id, p.id, 3).await.unwrap();
        let lines = store.cart_lines(cart.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 5);

        assert!(!store.add_to_cart(cart.id, p.id, i32::MAX).await.unwrap());
        assert_eq!(store.cart_lines(cart.id).await.unwrap()[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_lines_are_scoped_to_their_cart() {
        let store = MemoryStore::new();
        let p = store.add_product(NewProduct::new("Blush", Decimal::from(300), 10)).await;
        let mine = store.get_or_create_cart("mine").await.unwrap();
        let theirs = store.get_or_create_cart("theirs").await.unwrap();
        store.add_to_cart(theirs.id, p.id, 1).await.unwrap();
        let item_id = store.cart_lines(theirs.id).await.unwrap()[0].item_id;
        assert!(store.cart_line(mine.id, item_id).await.unwrap().is_none());
        assert!(!store.remove_line(mine.id, item_id).await.unwrap());
        assert!(store.remove_line(theirs.id, item_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = MemoryStore::new();
        let p = store.add_product(NewProduct::new("Toner", Decimal::from(500), 4)).await;
        {
            let mut tx = store.begin_checkout().await.unwrap();
            assert!(tx.take_stock(p.id, 3).await.unwrap());
            assert!(!tx.take_stock(p.id, 3).await.unwrap());
        }
        assert_eq!(store.product(p.id).await.unwrap().stock, 4);

        let mut tx = store.begin_checkout().await.unwrap();
        assert!(tx.take_stock(p.id, 3).await.unwrap());
        tx.commit().await.unwrap();
        assert_eq!(store.product(p.id).await.unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_inactive_products_are_hidden() {
        let store = MemoryStore::new();
        let cat = store.add_category("Nails").await;
        let shown = store.add_product(NewProduct::new("Polish", Decimal::from(90), 3).in_category(cat.id)).await;
        let hidden = store.add_product(NewProduct::new("Old Polish", Decimal::from(90), 3).inactive()).await;
        assert!(store.active_product(hidden.id).await.unwrap().is_none());
        let listed = store.list_products(Some(cat.id)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, shown.id);
        assert_eq!(listed[0].category_name.as_deref(), Some("Nails"));
    }
}
