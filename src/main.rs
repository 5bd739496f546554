//! Storefront - session cart and checkout service

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::{api, config::Config, services::EventPublisher, storage};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = Config::from_env()?;
    let store = storage::init_store(&config).await?;
    let events = EventPublisher::connect(config.nats_url.as_deref()).await;
    let app = api::router(api::AppState::new(store, config.shipping.clone(), events));

    tracing::info!(free_shipping_city = config.shipping.free_city(), flat_fee = %config.shipping.flat_fee(), "shipping policy");
    tracing::info!("Storefront listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?, app).await?;
    Ok(())
}
