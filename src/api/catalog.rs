use axum::{extract::{Path, State}, Json};

use crate::api::AppState;
use crate::domain::aggregates::{Category, Product};
use crate::error::Result;

pub async fn list_products(State(s): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(s.catalog.products().await?))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<i64>) -> Result<Json<Product>> {
    Ok(Json(s.catalog.product(id).await?))
}

pub async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(s.catalog.categories().await?))
}

pub async fn products_by_category(State(s): State<AppState>, Path(category_id): Path<i64>) -> Result<Json<Vec<Product>>> {
    Ok(Json(s.catalog.products_in_category(category_id).await?))
}
