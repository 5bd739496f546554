//! Session identity for anonymous shoppers.
//!
//! The key comes from the `X-Session-Key` header or the `sessionid` cookie.
//! When neither holds a usable key a new one is minted and set as a cookie.

use axum::{
    extract::Request,
    http::{header::{COOKIE, SET_COOKIE}, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::domain::value_objects::SessionKey;

pub const COOKIE_NAME: &str = "sessionid";
pub const HEADER_NAME: &str = "x-session-key";

pub fn from_headers(headers: &HeaderMap) -> Option<SessionKey> {
    let header = headers.get(HEADER_NAME).and_then(|v| v.to_str().ok()).and_then(|v| SessionKey::new(v).ok());
    header.or_else(|| {
        headers.get_all(COOKIE).iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == COOKIE_NAME)
            .and_then(|(_, value)| SessionKey::new(value).ok())
    })
}

pub async fn attach(mut req: Request, next: Next) -> Response {
    let (session, fresh) = match from_headers(req.headers()) {
        Some(session) => (session, false),
        None => (SessionKey::generate(), true),
    };
    req.extensions_mut().insert(session.clone());
    let mut res = next.run(req).await;
    if fresh {
        match HeaderValue::from_str(&format!("{COOKIE_NAME}={session}; Path=/; HttpOnly; SameSite=Lax")) {
            Ok(cookie) => { res.headers_mut().append(SET_COOKIE, cookie); }
            Err(e) => warn!(error = %e, "could not encode session cookie"),
        }
    }
    res
}
