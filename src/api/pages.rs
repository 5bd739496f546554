//! Static page shells. The browser scripts fill them from the JSON API.

use axum::{extract::Path, response::Html, routing::get, Router};

use crate::api::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/products", get(products))
        .route("/product/:id", get(product_detail))
        .route("/cart", get(cart))
        .route("/checkout", get(checkout))
}

fn page(title: &str, main: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{title} | Storefront</title></head>\n<body>\n<main>{main}</main>\n<script src=\"/static/js/main.js\"></script>\n</body>\n</html>\n"
    ))
}

async fn home() -> Html<String> { page("Home", "<section id=\"featured-products\"></section>") }

async fn products() -> Html<String> { page("Products", "<section id=\"product-list\"></section>") }

async fn product_detail(Path(id): Path<i64>) -> Html<String> {
    page("Product", &format!("<section id=\"product-detail\" data-product-id=\"{id}\"></section>"))
}

async fn cart() -> Html<String> { page("Cart", "<section id=\"cart\"></section>") }

async fn checkout() -> Html<String> { page("Checkout", "<form id=\"checkout-form\"></form>") }
