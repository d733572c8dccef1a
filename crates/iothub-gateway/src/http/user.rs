use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::http::auth::session_cookie;
use crate::http::error::ApiResult;

#[derive(Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /api/user/signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(req) = body?;
    // PBKDF2 is CPU-bound; keep it off the async workers.
    let st = Arc::clone(&state);
    tokio::task::spawn_blocking(move || st.auth.signup(req.email.trim(), &req.password))
        .await??;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User created successfully.",
        })),
    ))
}

/// POST /api/user/login — returns the token and sets it as a cookie.
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = body?;
    let st = Arc::clone(&state);
    let issued =
        tokio::task::spawn_blocking(move || st.auth.login(req.email.trim(), &req.password))
            .await??;

    let cookie = session_cookie(
        &issued.token,
        issued.expires_at,
        state.config.auth.secure_cookie,
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "success": true,
            "message": "Login successful.",
            "token": issued.token,
        })),
    )
        .into_response())
}
