use thiserror::Error;

/// Cross-cutting error taxonomy. Subsystem crates keep their own error enums
/// and the gateway folds them into these categories.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// Missing/invalid/expired token or bad credentials.
    #[error("{0}")]
    Auth(String),

    #[error("Limit reached: Free Tier users can {action} a maximum of {limit} {resource}.")]
    QuotaExceeded {
        action: &'static str,
        resource: &'static str,
        limit: u32,
    },

    /// The resource is not visible to the caller, whether it exists or not.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HubError {
    /// Short, stable error code for clients and logs.
    pub fn code(&self) -> &'static str {
        match self {
            HubError::Config(_) => "CONFIG_ERROR",
            HubError::Validation(_) => "VALIDATION_ERROR",
            HubError::Auth(_) => "AUTH_FAILED",
            HubError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            HubError::Forbidden(_) => "FORBIDDEN",
            HubError::NotFound(_) => "NOT_FOUND",
            HubError::Conflict(_) => "CONFLICT",
            HubError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
