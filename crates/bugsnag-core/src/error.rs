//! Error types for bugsnag-mcp.

use thiserror::Error;

/// Main error type for Bugsnag operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed before a response was received
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication failed (401/403)
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Requested entity does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// API returned any other non-success status
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body could not be mapped to the expected shape
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Classify a non-success HTTP status into an error variant.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => Error::Auth(message),
            404 => Error::NotFound(message),
            _ => Error::Api { status, message },
        }
    }
}

/// Result type alias for Bugsnag operations.
pub type Result<T> = std::result::Result<T, Error>;
