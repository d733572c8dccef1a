use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::http::auth::AuthUser;
use crate::http::error::{ApiError, ApiResult};

#[derive(Deserialize)]
pub struct AddDeviceRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub device_key: String,
}

#[derive(Deserialize)]
pub struct DeviceIdRequest {
    pub id: Option<i64>,
}

/// POST /api/device/add
pub async fn add_device(
    State(state): State<Arc<AppState>>,
    AuthUser(owner): AuthUser,
    body: Result<Json<AddDeviceRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(req) = body?;
    let current = state
        .registry
        .add_device(&owner, &req.name, &req.device_key)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Device registered successfully.",
            "current_devices": current,
        })),
    ))
}

/// GET /api/device/list
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
    AuthUser(owner): AuthUser,
) -> ApiResult<Json<Value>> {
    let devices = state.registry.list_devices(&owner)?;
    Ok(Json(json!({ "success": true, "devices": devices })))
}

/// DELETE /api/device/delete — also removes the device's schedules.
pub async fn delete_device(
    State(state): State<Arc<AppState>>,
    AuthUser(owner): AuthUser,
    body: Result<Json<DeviceIdRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let id = req
        .id
        .ok_or_else(|| ApiError::validation("Device ID is required."))?;
    state.registry.delete_device(&owner, id)?;

    Ok(Json(json!({
        "success": true,
        "message": "Device deleted successfully.",
    })))
}
