//! Application services: the operations the HTTP layer exposes.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod events;
pub mod orders;

pub use cart::CartService;
pub use catalog::Catalog;
pub use checkout::{CheckoutForm, OrderAssembler};
pub use events::EventPublisher;
pub use orders::OrderLookup;
