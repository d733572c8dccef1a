use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health — liveness probe, returns server metadata.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "scheduler": state.config.scheduler.enabled,
    }))
}

/// GET /
pub async fn welcome() -> &'static str {
    "Welcome to IoT Hub API. Try POSTing to /api/user/signup"
}
