use axum::{extract::{Path, State}, http::StatusCode, Extension, Json};
use serde_json::{json, Value};

use crate::api::{ApiJson, AppState};
use crate::domain::aggregates::{OrderTracking, OrderView};
use crate::domain::value_objects::SessionKey;
use crate::error::{Result, ShopError};
use crate::services::CheckoutForm;

pub async fn create_order(State(s): State<AppState>, Extension(session): Extension<SessionKey>, body: std::result::Result<ApiJson<CheckoutForm>, ShopError>) -> Result<(StatusCode, Json<Value>)> {
    let ApiJson(form) = body.map_err(ShopError::into_field_errors)?;
    let order = s.checkout.checkout(&session, form).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Order placed successfully!", "order": order.view() }))))
}

pub async fn get_order(State(s): State<AppState>, Path(id): Path<i64>) -> Result<Json<OrderView>> {
    Ok(Json(s.orders.get(id).await?.view()))
}

pub async fn list_orders(State(s): State<AppState>) -> Result<Json<Vec<OrderView>>> {
    Ok(Json(s.orders.list().await?.iter().map(|o| o.view()).collect()))
}

pub async fn track_order(State(s): State<AppState>, Path(id): Path<i64>) -> Result<Json<OrderTracking>> {
    Ok(Json(s.orders.track(id).await?))
}
