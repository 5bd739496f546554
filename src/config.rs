//! Service configuration, read from the environment (and `.env` via dotenvy).

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::str::FromStr;
use crate::domain::value_objects::ShippingPolicy;

#[derive(Clone, Debug)]
pub struct Config {
    /// PostgreSQL connection string. Without one the in-memory store is used.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub port: u16,
    pub nats_url: Option<String>,
    pub shipping: ShippingPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let max_connections = parse::<u32>("DATABASE_MAX_CONNECTIONS", &or("DATABASE_MAX_CONNECTIONS", "10"))?;
        let port = parse::<u16>("PORT", &or("PORT", "8083"))?;
        let flat_fee = parse::<Decimal>("SHIPPING_FLAT_FEE", &or("SHIPPING_FLAT_FEE", "60"))?;
        if flat_fee.is_sign_negative() { anyhow::bail!("SHIPPING_FLAT_FEE must not be negative"); }

        Ok(Self {
            database_url: var("DATABASE_URL"),
            max_connections,
            port,
            nats_url: var("NATS_URL"),
            shipping: ShippingPolicy::new(or("FREE_SHIPPING_CITY", "dhaka"), flat_fee),
        })
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>().with_context(|| format!("invalid {key}: {raw:?}"))
}
