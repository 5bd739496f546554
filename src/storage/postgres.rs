//! PostgreSQL Store implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::aggregates::{Cart, CartLine, Category, CustomerDetails, NewOrder, NewOrderItem, Order, OrderItem, Product, UnknownChoice};
use crate::error::{Result, ShopError};
use crate::storage::{CheckoutTransaction, Store};

const PRODUCT_COLUMNS: &str = "p.id, p.category_id, c.name AS category_name, p.name, p.description, p.price, p.stock, p.image, p.is_active, p.created_at";

#[derive(sqlx::FromRow)]
struct CartLineRow {
    item_id: i64,
    quantity: i32,
    #[sqlx(flatten)]
    product: Product,
}

impl From<CartLineRow> for CartLine {
    fn from(r: CartLineRow) -> Self { CartLine { item_id: r.item_id, quantity: r.quantity, product: r.product } }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    shipping_address: String,
    city: String,
    postal_code: String,
    total_amount: Decimal,
    shipping_cost: Decimal,
    status: String,
    payment_method: String,
    is_paid: bool,
    note: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order> {
        let id = self.id;
        let corrupt = move |e: UnknownChoice| ShopError::Storage(format!("order {id}: {e}"));
        let status = self.status.parse().map_err(corrupt)?;
        let payment_method = self.payment_method.parse().map_err(corrupt)?;
        Ok(Order {
            id: self.id,
            customer: CustomerDetails {
                customer_name: self.customer_name, customer_email: self.customer_email, customer_phone: self.customer_phone,
                shipping_address: self.shipping_address, city: self.city, postal_code: self.postal_code,
                payment_method, note: self.note,
            },
            total_amount: self.total_amount,
            shipping_cost: self.shipping_cost,
            status,
            is_paid: self.is_paid,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn with_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let items = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = ANY($1) ORDER BY id")
            .bind(&ids).fetch_all(&self.pool).await?;
        let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for item in items { by_order.entry(item.order_id).or_default().push(item); }
        rows.into_iter().map(|r| { let items = by_order.remove(&r.id).unwrap_or_default(); r.into_order(items) }).collect()
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(sqlx::query_as::<_, Category>("SELECT id, name, slug, description FROM categories ORDER BY name").fetch_all(&self.pool).await?)
    }

    async fn list_products(&self, category_id: Option<i64>) -> Result<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p LEFT JOIN categories c ON c.id = p.category_id WHERE p.is_active AND ($1::BIGINT IS NULL OR p.category_id = $1) ORDER BY p.created_at DESC, p.id DESC");
        Ok(sqlx::query_as::<_, Product>(&sql).bind(category_id).fetch_all(&self.pool).await?)
    }

    async fn active_product(&self, id: i64) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p LEFT JOIN categories c ON c.id = p.category_id WHERE p.id = $1 AND p.is_active");
        Ok(sqlx::query_as::<_, Product>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn get_or_create_cart(&self, session_key: &str) -> Result<Cart> {
        Ok(sqlx::query_as::<_, Cart>("INSERT INTO carts (session_key) VALUES ($1) ON CONFLICT (session_key) DO UPDATE SET session_key = EXCLUDED.session_key RETURNING *")
            .bind(session_key).fetch_one(&self.pool).await?)
    }

    async fn find_cart(&self, session_key: &str) -> Result<Option<Cart>> {
        Ok(sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE session_key = $1").bind(session_key).fetch_optional(&self.pool).await?)
    }

    async fn cart_lines(&self, cart_id: i64) -> Result<Vec<CartLine>> {
        let sql = format!("SELECT ci.id AS item_id, ci.quantity, {PRODUCT_COLUMNS} FROM cart_items ci JOIN products p ON p.id = ci.product_id LEFT JOIN categories c ON c.id = p.category_id WHERE ci.cart_id = $1 ORDER BY ci.id");
        let rows = sqlx::query_as::<_, CartLineRow>(&sql).bind(cart_id).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    async fn cart_line(&self, cart_id: i64, item_id: i64) -> Result<Option<CartLine>> {
        let sql = format!("SELECT ci.id AS item_id, ci.quantity, {PRODUCT_COLUMNS} FROM cart_items ci JOIN products p ON p.id = ci.product_id LEFT JOIN categories c ON c.id = p.category_id WHERE ci.cart_id = $1 AND ci.id = $2");
        let row = sqlx::query_as::<_, CartLineRow>(&sql).bind(cart_id).bind(item_id).fetch_optional(&self.pool).await?;
        Ok(row.map(CartLine::from))
    }

    async fn add_to_cart(&self, cart_id: i64, product_id: i64, quantity: i32) -> Result<bool> {
        // The WHERE keeps the sum inside INTEGER; a skipped update affects no row.
        let done = sqlx::query("INSERT INTO cart_items (cart_id, product_id, quantity) VALUES ($1, $2, $3) ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity WHERE cart_items.quantity <= 2147483647 - EXCLUDED.quantity")
            .bind(cart_id).bind(product_id).bind(quantity).execute(&self.pool).await?;
        Ok(done.rows_affected() == 1)
    }

    async fn set_line_quantity(&self, cart_id: i64, item_id: i64, quantity: i32) -> Result<()> {
        let done = sqlx::query("UPDATE cart_items SET quantity = $3 WHERE id = $1 AND cart_id = $2")
            .bind(item_id).bind(cart_id).bind(quantity).execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(ShopError::ITEM_NOT_FOUND); }
        Ok(())
    }

    async fn remove_line(&self, cart_id: i64, item_id: i64) -> Result<bool> {
        let done = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2").bind(item_id).bind(cart_id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn clear_cart(&self, cart_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart_id).execute(&self.pool).await?;
        Ok(())
    }

    async fn order(&self, id: i64) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(self.with_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders ORDER BY created_at DESC, id DESC").fetch_all(&self.pool).await?;
        self.with_items(rows).await
    }

    async fn begin_checkout(&self) -> Result<Box<dyn CheckoutTransaction>> {
        Ok(Box::new(PostgresTransaction { tx: self.pool.begin().await? }))
    }
}

struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CheckoutTransaction for PostgresTransaction {
    async fn lock_cart_lines(&mut self, cart_id: i64) -> Result<Vec<CartLine>> {
        // Product rows in id order so concurrent checkouts lock in the same sequence.
        let sql = format!("SELECT ci.id AS item_id, ci.quantity, {PRODUCT_COLUMNS} FROM cart_items ci JOIN products p ON p.id = ci.product_id LEFT JOIN categories c ON c.id = p.category_id WHERE ci.cart_id = $1 ORDER BY p.id FOR UPDATE OF p, ci");
        let rows = sqlx::query_as::<_, CartLineRow>(&sql).bind(cart_id).fetch_all(&mut *self.tx).await?;
        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    async fn insert_order(&mut self, new: &NewOrder) -> Result<Order> {
        let c = &new.customer;
        let row = sqlx::query_as::<_, OrderRow>("INSERT INTO orders (customer_name, customer_email, customer_phone, shipping_address, city, postal_code, total_amount, shipping_cost, status, payment_method, is_paid, note) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', $9, FALSE, $10) RETURNING *")
            .bind(&c.customer_name).bind(&c.customer_email).bind(&c.customer_phone).bind(&c.shipping_address)
            .bind(&c.city).bind(&c.postal_code).bind(new.total_amount).bind(new.shipping_cost)
            .bind(c.payment_method.as_str()).bind(&c.note)
            .fetch_one(&mut *self.tx).await?;
        row.into_order(vec![])
    }

    async fn insert_order_item(&mut self, order_id: i64, new: &NewOrderItem) -> Result<OrderItem> {
        Ok(sqlx::query_as::<_, OrderItem>("INSERT INTO order_items (order_id, product_id, product_name, product_price, quantity) VALUES ($1, $2, $3, $4, $5) RETURNING *")
            .bind(order_id).bind(new.product_id).bind(&new.product_name).bind(new.product_price).bind(new.quantity)
            .fetch_one(&mut *self.tx).await?)
    }

    async fn take_stock(&mut self, product_id: i64, quantity: i32) -> Result<bool> {
        let done = sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2")
            .bind(product_id).bind(quantity).execute(&mut *self.tx).await?;
        Ok(done.rows_affected() == 1)
    }

    async fn clear_cart(&mut self, cart_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart_id).execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
