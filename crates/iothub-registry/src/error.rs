use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Missing or malformed input; the message is user-facing.
    #[error("{0}")]
    Validation(String),

    #[error("Limit reached: Free Tier users can {action} a maximum of {limit} {resource}.")]
    QuotaExceeded {
        action: &'static str,
        resource: &'static str,
        limit: u32,
    },

    /// Device is missing or belongs to someone else; the two are not told apart.
    #[error("Device ID is invalid or does not belong to your account.")]
    DeviceNotOwned,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
