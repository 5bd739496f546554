//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Number of decimal places every monetary amount carries.
pub const MONEY_SCALE: u32 = 2;

/// Normalizes an amount to two decimal places.
pub fn money(mut amount: Decimal) -> Decimal {
    amount.rescale(MONEY_SCALE);
    amount
}

/// `price * quantity`, normalized.
pub fn line_total(price: Decimal, quantity: i32) -> Decimal {
    money(price * Decimal::from(quantity))
}

/// Opaque token identifying one shopper's session (and therefore one cart).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey(String);

impl SessionKey {
    pub const MAX_LEN: usize = 64;

    pub fn new(value: impl Into<String>) -> Result<Self, SessionKeyError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(SessionKeyError::Empty); }
        if value.len() > Self::MAX_LEN { return Err(SessionKeyError::TooLong); }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(SessionKeyError::InvalidCharacter);
        }
        Ok(Self(value))
    }

    pub fn generate() -> Self { Self(Uuid::new_v4().simple().to_string()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum SessionKeyError { Empty, TooLong, InvalidCharacter }
impl std::error::Error for SessionKeyError {}
impl fmt::Display for SessionKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "session key empty"),
            Self::TooLong => write!(f, "session key too long"),
            Self::InvalidCharacter => write!(f, "session key has invalid characters"),
        }
    }
}

/// Shipping is free inside one city and a flat fee everywhere else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShippingPolicy { free_city: String, flat_fee: Decimal }

impl ShippingPolicy {
    pub fn new(free_city: impl Into<String>, flat_fee: Decimal) -> Self {
        Self { free_city: free_city.into().trim().to_lowercase(), flat_fee: money(flat_fee) }
    }

    pub fn free_city(&self) -> &str { &self.free_city }
    pub fn flat_fee(&self) -> Decimal { self.flat_fee }

    pub fn cost_for(&self, city: &str) -> Decimal {
        if city.trim().to_lowercase() == self.free_city { money(Decimal::ZERO) } else { self.flat_fee }
    }
}

impl Default for ShippingPolicy { fn default() -> Self { Self::new("dhaka", Decimal::from(60)) } }
