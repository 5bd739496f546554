//! Storefront
//!
//! Small shop backend: a read-only catalog, a session-scoped shopping cart,
//! and checkout that turns the cart into an immutable order.
//!
//! ## Features
//! - Catalog browsing (products, categories)
//! - Session cart: add, update, remove, clear
//! - Checkout in one transaction: order snapshot, stock decrement, cart clearing
//! - Order lookup and tracking
//! - PostgreSQL or in-memory storage

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod storage;

pub use error::{Result, ShopError};
