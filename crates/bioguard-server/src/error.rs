//! Error types for the BioGuard server

use thiserror::Error;

/// Result type alias for server bootstrap operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors raised while configuring or starting the server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Guard configuration error
    #[error("Guard configuration error: {0}")]
    Guard(#[from] bioguard_core::ConfigError),

    /// User store error
    #[error("Store error: {0}")]
    Store(#[from] bioguard_core::StoreError),

    /// Mailer setup error
    #[error("Mailer error: {0}")]
    Mail(#[from] bioguard_core::MailError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Access token error
    #[error("Access token error: {0}")]
    Token(String),
}

impl From<serde_json::Error> for ServerError {
    fn from(e: serde_json::Error) -> Self {
        ServerError::Serialization(e.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for ServerError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        ServerError::Token(e.to_string())
    }
}
