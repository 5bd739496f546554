use axum::{extract::{Path, State}, Extension, Json};
use serde::Deserialize;

use crate::api::{ApiJson, AppState};
use crate::domain::aggregates::CartView;
use crate::domain::value_objects::SessionKey;
use crate::error::{Result, ShopError};

fn one() -> i32 { 1 }

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: Option<i64>,
    #[serde(default = "one")]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartItemRequest {
    #[serde(default = "one")]
    pub quantity: i32,
}

pub async fn get_cart(State(s): State<AppState>, Extension(session): Extension<SessionKey>) -> Result<Json<CartView>> {
    Ok(Json(s.cart.view(&session).await?))
}

pub async fn add_to_cart(State(s): State<AppState>, Extension(session): Extension<SessionKey>, ApiJson(r): ApiJson<AddToCartRequest>) -> Result<Json<CartView>> {
    let product_id = r.product_id.ok_or(ShopError::PRODUCT_NOT_FOUND)?;
    Ok(Json(s.cart.add(&session, product_id, r.quantity).await?))
}

pub async fn update_item(State(s): State<AppState>, Extension(session): Extension<SessionKey>, Path(id): Path<i64>, ApiJson(r): ApiJson<UpdateCartItemRequest>) -> Result<Json<CartView>> {
    Ok(Json(s.cart.update(&session, id, r.quantity).await?))
}

pub async fn remove_item(State(s): State<AppState>, Extension(session): Extension<SessionKey>, Path(id): Path<i64>) -> Result<Json<CartView>> {
    Ok(Json(s.cart.remove(&session, id).await?))
}

pub async fn clear_cart(State(s): State<AppState>, Extension(session): Extension<SessionKey>) -> Result<Json<CartView>> {
    Ok(Json(s.cart.clear(&session).await?))
}
