//! Mapping from subsystem errors to HTTP responses.
//!
//! Every failure is rendered as `{"success": false, "code": …, "message": …}`.
//! Internal failures are logged here and reach the client only as a generic
//! message.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use iothub_auth::AuthError;
use iothub_core::HubError;
use iothub_registry::RegistryError;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub HubError);

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self(HubError::Validation(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            HubError::Validation(_) => StatusCode::BAD_REQUEST,
            HubError::Auth(_) => StatusCode::UNAUTHORIZED,
            HubError::QuotaExceeded { .. } | HubError::Forbidden(_) => StatusCode::FORBIDDEN,
            HubError::NotFound(_) => StatusCode::NOT_FOUND,
            HubError::Conflict(_) => StatusCode::CONFLICT,
            HubError::Config(_) | HubError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            HubError::Config(detail) | HubError::Internal(detail) => {
                error!(code = self.0.code(), %detail, "request failed");
                "Internal server error.".to_string()
            }
            other => other.to_string(),
        };
        (
            status,
            Json(json!({
                "success": false,
                "code": self.0.code(),
                "message": message,
            })),
        )
            .into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        Self(match e {
            AuthError::InvalidInput(msg) => HubError::Validation(msg),
            AuthError::InvalidCredentials => HubError::Auth(e.to_string()),
            AuthError::AlreadyExists => HubError::Conflict(e.to_string()),
            AuthError::Database(_) | AuthError::Serialization(_) | AuthError::Internal(_) => {
                HubError::Internal(e.to_string())
            }
        })
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        Self(match e {
            RegistryError::Validation(msg) => HubError::Validation(msg),
            RegistryError::QuotaExceeded {
                action,
                resource,
                limit,
            } => HubError::QuotaExceeded {
                action,
                resource,
                limit,
            },
            RegistryError::DeviceNotOwned => HubError::Forbidden(e.to_string()),
            RegistryError::NotFound(msg) => HubError::NotFound(msg),
            RegistryError::Conflict(msg) => HubError::Conflict(msg),
            RegistryError::Database(_) | RegistryError::Internal(_) => {
                HubError::Internal(e.to_string())
            }
        })
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection, "rejected request body");
        Self::validation("Invalid JSON format or missing fields in request body.")
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self(HubError::Internal(format!("blocking task failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        let cases = [
            (ApiError::from(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED),
            (ApiError::from(AuthError::AlreadyExists), StatusCode::CONFLICT),
            (
                ApiError::from(RegistryError::QuotaExceeded {
                    action: "register",
                    resource: "devices",
                    limit: 5,
                }),
                StatusCode::FORBIDDEN,
            ),
            (ApiError::from(RegistryError::DeviceNotOwned), StatusCode::FORBIDDEN),
            (
                ApiError::from(RegistryError::NotFound("Device not found.".into())),
                StatusCode::NOT_FOUND,
            ),
            (ApiError::validation("bad"), StatusCode::BAD_REQUEST),
            (
                ApiError::from(AuthError::Internal("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status, "{err}");
        }
    }

    #[tokio::test]
    async fn internal_detail_is_not_leaked() {
        let resp = ApiError::from(AuthError::Internal("lock poisoned".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert_eq!(body["message"], "Internal server error.");
    }
}
