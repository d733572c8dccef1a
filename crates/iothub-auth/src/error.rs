use thiserror::Error;

/// Auth-layer errors. Kept separate from HubError so the gateway can map
/// them to HTTP statuses without coupling layers.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing field or policy violation; the message is user-facing.
    #[error("{0}")]
    InvalidInput(String),

    /// Unknown email or wrong password. Deliberately indistinguishable.
    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("User with this email already exists.")]
    AlreadyExists,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
