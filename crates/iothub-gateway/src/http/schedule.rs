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
pub struct SetScheduleRequest {
    pub device_id: Option<i64>,
    #[serde(default)]
    pub cron_expression: String,
    #[serde(default)]
    pub action: String,
}

#[derive(Deserialize)]
pub struct ScheduleIdRequest {
    pub id: Option<i64>,
}

#[derive(Deserialize)]
pub struct ToggleRequest {
    pub id: Option<i64>,
    pub active: Option<bool>,
}

/// POST /api/schedule/set
pub async fn set_schedule(
    State(state): State<Arc<AppState>>,
    AuthUser(owner): AuthUser,
    body: Result<Json<SetScheduleRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(req) = body?;
    let device_id = req.device_id.ok_or_else(|| {
        ApiError::validation("Missing device_id, cron_expression, or action.")
    })?;
    let current =
        state
            .registry
            .add_schedule(&owner, device_id, &req.cron_expression, &req.action)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Schedule created successfully.",
            "current_schedules": current,
        })),
    ))
}

/// GET /api/schedule/list
pub async fn list_schedules(
    State(state): State<Arc<AppState>>,
    AuthUser(owner): AuthUser,
) -> ApiResult<Json<Value>> {
    let schedules = state.registry.list_schedules(&owner)?;
    Ok(Json(json!({ "success": true, "schedules": schedules })))
}

/// DELETE /api/schedule/delete
pub async fn delete_schedule(
    State(state): State<Arc<AppState>>,
    AuthUser(owner): AuthUser,
    body: Result<Json<ScheduleIdRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let id = req
        .id
        .ok_or_else(|| ApiError::validation("Schedule ID is required."))?;
    state.registry.delete_schedule(&owner, id)?;

    Ok(Json(json!({
        "success": true,
        "message": "Schedule deleted successfully.",
    })))
}

/// POST /api/schedule/toggle — `{id, active}`.
pub async fn toggle_schedule(
    State(state): State<Arc<AppState>>,
    AuthUser(owner): AuthUser,
    body: Result<Json<ToggleRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let (Some(id), Some(active)) = (req.id, req.active) else {
        return Err(ApiError::validation("Schedule ID and active flag are required."));
    };
    state.registry.toggle_schedule(&owner, id, active)?;

    let message = if active {
        "Schedule enabled."
    } else {
        "Schedule disabled."
    };
    Ok(Json(json!({ "success": true, "message": message })))
}
