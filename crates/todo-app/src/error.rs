//! Error types for the to-do client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Identity provider refused or failed the request
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Outbound HTTP failed before a response arrived
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Task store error
    #[error(transparent)]
    Store(#[from] todo_core::Error),
}
