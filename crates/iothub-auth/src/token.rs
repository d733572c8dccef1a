//! Stateless HS256 session tokens.
//!
//! `base64url(header) . base64url(payload) . base64url(hmac_sha256(secret, first_two))`
//!
//! Nothing is persisted: a token is valid iff its signature checks out under
//! the current secret and its `exp` has not passed. There is no revocation
//! list; rotating the secret invalidates every outstanding token.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use iothub_core::{Clock, Owner};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use crate::error::{AuthError, Result};

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_ISSUER: &str = "IoT_Hub_API";
pub const TOKEN_AUDIENCE: &str = "user";
pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Signed payload. Field order matches the JSON emitted on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub iss: String,
    pub aud: String,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// A freshly signed token together with the instant its `exp` claim names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Build and sign a token for `email`, issued at `now`.
pub fn issue_token(email: &str, secret: &str, now: DateTime<Utc>) -> Result<IssuedToken> {
    let header = Header {
        alg: "HS256".to_string(),
        typ: "JWT".to_string(),
    };
    let iat = now.timestamp();
    let claims = Claims {
        email: email.to_string(),
        iss: TOKEN_ISSUER.to_string(),
        aud: TOKEN_AUDIENCE.to_string(),
        iat,
        exp: iat + Duration::hours(TOKEN_TTL_HOURS).num_seconds(),
    };

    let encoded_header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
    let encoded_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
    let signing_input = format!("{encoded_header}.{encoded_payload}");

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AuthError::Internal("invalid HMAC key length".to_string()))?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    let expires_at = DateTime::from_timestamp(claims.exp, 0)
        .ok_or_else(|| AuthError::Internal("token expiry out of range".to_string()))?;
    Ok(IssuedToken {
        token: format!("{signing_input}.{signature}"),
        expires_at,
    })
}

/// Verify `token` against `secret` at time `now`.
///
/// Every failure (shape, encoding, signature, claims, expiry) collapses to
/// `None`; the reason is only logged at debug level.
pub fn verify_token(token: &str, secret: &str, now: DateTime<Utc>) -> Option<Claims> {
    match check_token(token, secret, now) {
        Ok(claims) => Some(claims),
        Err(reason) => {
            debug!(reason, "session token rejected");
            None
        }
    }
}

fn check_token(
    token: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> std::result::Result<Claims, &'static str> {
    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err("malformed");
    };

    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| "signature encoding")?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| "key")?;
    mac.update(header.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    // verify_slice compares in constant time.
    mac.verify_slice(&signature).map_err(|_| "signature")?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| "payload encoding")?;
    let claims: Claims = serde_json::from_slice(&payload).map_err(|_| "payload json")?;

    if claims.iss != TOKEN_ISSUER || claims.aud != TOKEN_AUDIENCE {
        return Err("issuer/audience");
    }
    if claims.exp < now.timestamp() {
        return Err("expired");
    }
    if claims.email.is_empty() {
        return Err("subject");
    }
    Ok(claims)
}

/// Issues and verifies session tokens with a fixed secret and an injected clock.
pub struct SessionManager {
    secret: String,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(secret: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret: secret.into(),
            clock,
        }
    }

    pub fn issue(&self, email: &str) -> Result<IssuedToken> {
        issue_token(email, &self.secret, self.clock.now())
    }

    /// Returns the token's owner, or `None` for any invalid token.
    pub fn verify(&self, token: &str) -> Option<Owner> {
        verify_token(token, &self.secret, self.clock.now()).map(|c| Owner::new(c.email))
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("secret", &"<redacted>")
            .finish()
    }
}
