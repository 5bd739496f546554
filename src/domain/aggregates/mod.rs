//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{Category, NewProduct, Product};
pub use order::{CustomerDetails, NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, OrderTracking, OrderView, PaymentMethod, UnknownChoice};
pub use cart::{Cart, CartLine, CartView};
