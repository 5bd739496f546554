//! Error taxonomy shared by the services and the HTTP layer.

use axum::{extract::rejection::JsonRejection, http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use std::borrow::Cow;
use std::collections::BTreeMap;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("{0}")]
    NotFound(&'static str),

    #[error("Invalid checkout details")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    MalformedBody(String),

    #[error("Not enough stock for {0}")]
    InsufficientStock(String),

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ShopError {
    pub const PRODUCT_NOT_FOUND: Self = Self::NotFound("Product not found");
    pub const ITEM_NOT_FOUND: Self = Self::NotFound("Item not found in cart");
    pub const ORDER_NOT_FOUND: Self = Self::NotFound("Order not found");

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::MalformedBody(_) | Self::InsufficientStock(_) | Self::InvalidQuantity | Self::EmptyCart => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Reports an unreadable body the way form validation reports fields,
    /// under `non_field_errors`.
    pub fn into_field_errors(self) -> Self {
        match self {
            Self::MalformedBody(detail) => {
                let mut err = ValidationError::new("invalid");
                err.message = Some(Cow::Owned(detail));
                let mut errors = ValidationErrors::new();
                errors.add("non_field_errors", err);
                Self::Validation(errors)
            }
            other => other,
        }
    }
}

impl From<JsonRejection> for ShopError {
    fn from(rejection: JsonRejection) -> Self { Self::MalformedBody(rejection.body_text()) }
}

impl From<sqlx::Error> for ShopError {
    fn from(e: sqlx::Error) -> Self { Self::Storage(e.to_string()) }
}

impl From<sqlx::migrate::MigrateError> for ShopError {
    fn from(e: sqlx::migrate::MigrateError) -> Self { Self::Storage(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, ShopError>;

/// `{field: [messages]}` in field-name order.
pub fn field_messages(errors: &ValidationErrors) -> BTreeMap<&'static str, Vec<String>> {
    errors.field_errors().into_iter().map(|(field, errs)| {
        let messages = errs.iter().map(|e| e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string())).collect();
        (field, messages)
    }).collect()
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Validation(errors) => json!({ "errors": field_messages(errors) }),
            Self::Storage(detail) => {
                tracing::error!(error = %detail, "storage failure");
                json!({ "error": "Internal server error" })
            }
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
