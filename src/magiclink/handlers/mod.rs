pub mod admin;
pub use self::admin::AdminToken;

pub mod health;
pub use self::health::health;

pub mod login;

// common functions for the handlers
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use secrecy::ExposeSecret;
use std::net::SocketAddr;

/// Client address as seen by a reverse proxy, falling back to the peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }

    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

/// Check the `Authorization: Bearer <token>` header against the admin token.
pub fn require_admin(headers: &HeaderMap, admin: &AdminToken) -> Result<(), StatusCode> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = value
        .trim()
        .strip_prefix("Bearer ")
        .or_else(|| value.trim().strip_prefix("bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?
        .trim();

    if constant_time_eq(token.as_bytes(), admin.0.expose_secret().as_bytes()) {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
