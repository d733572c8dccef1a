//! Session token extraction for protected routes.
//!
//! `Authorization: Bearer <token>` wins; otherwise the `auth_token` cookie
//! set at login is used.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use chrono::{DateTime, Utc};
use iothub_core::{HubError, Owner};
use tracing::debug;

use crate::app::AppState;
use crate::http::error::ApiError;

pub const AUTH_COOKIE: &str = "auth_token";

const MISSING_TOKEN: &str = "Missing Authorization Token.";
const INVALID_TOKEN: &str = "Invalid or Expired Token. Please log in again.";

/// The owner behind a valid session token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Owner);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer(&parts.headers)
            .or_else(|| extract_cookie(&parts.headers, AUTH_COOKIE))
            .ok_or_else(|| {
                debug!(path = %parts.uri.path(), "request without session token");
                ApiError(HubError::Auth(MISSING_TOKEN.to_string()))
            })?;

        state
            .auth
            .authenticate(token)
            .map(AuthUser)
            .ok_or_else(|| ApiError(HubError::Auth(INVALID_TOKEN.to_string())))
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn extract_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}

/// `Set-Cookie` value carrying the session token until `expires`.
pub fn session_cookie(token: &str, expires: DateTime<Utc>, secure: bool) -> String {
    let mut cookie = format!(
        "{AUTH_COOKIE}={token}; Expires={}; Path=/; HttpOnly",
        expires.format("%a, %d %b %Y %H:%M:%S GMT")
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie.push_str("; SameSite=Lax");
    cookie
}
