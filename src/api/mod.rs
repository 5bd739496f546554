//! HTTP surface: JSON API under `/api`, page shells, and health.

use std::sync::Arc;

use axum::{extract::FromRequest, middleware, routing::{delete, get, post, put}, Json, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::domain::value_objects::ShippingPolicy;
use crate::error::ShopError;
use crate::services::{CartService, Catalog, EventPublisher, OrderAssembler, OrderLookup};
use crate::storage::Store;

pub mod cart;
pub mod catalog;
pub mod orders;
pub mod pages;
pub mod session;


/// `Json` whose rejections answer with a `ShopError` body instead of plain text.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ShopError))]
pub struct ApiJson<T>(pub T);

#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub cart: CartService,
    pub checkout: OrderAssembler,
    pub orders: OrderLookup,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, shipping: ShippingPolicy, events: EventPublisher) -> Self {
        Self {
            catalog: Catalog::new(store.clone()),
            cart: CartService::new(store.clone()),
            checkout: OrderAssembler::new(store.clone(), shipping, events),
            orders: OrderLookup::new(store),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/products", get(catalog::list_products))
        .route("/products/categories", get(catalog::list_categories))
        .route("/products/:id", get(catalog::get_product))
        .route("/products/category/:id", get(catalog::products_by_category))
        .route("/cart", get(cart::get_cart))
        .route("/cart/add", post(cart::add_to_cart))
        .route("/cart/item/:id", put(cart::update_item).delete(cart::remove_item))
        .route("/cart/update/:id", put(cart::update_item))
        .route("/cart/remove/:id", delete(cart::remove_item))
        .route("/cart/clear", delete(cart::clear_cart))
        .route("/orders", get(orders::list_orders))
        .route("/orders/create", post(orders::create_order))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/track/:id", get(orders::track_order));

    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront"})) }))
        .merge(pages::routes())
        .nest("/api", api)
        .layer(middleware::from_fn(session::attach))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state)
}
