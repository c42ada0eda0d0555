//! Error types for biometric PIN operations

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::mailer::MailError;
use crate::pin::HashError;
use crate::store::StoreError;

/// Result type alias for guard operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// Errors returned by `BiometricGuard` operations
///
/// Collaborator failures (store, hasher, timeouts) are folded into
/// `Internal` at the operation boundary.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Malformed PIN or request input
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid primary session
    #[error("Authentication required")]
    NotAuthenticated,

    /// No user record for the given identity
    #[error("User not found")]
    UserNotFound,

    /// Biometric PIN has not been set up
    #[error("Biometric PIN not configured")]
    NotConfigured,

    /// PIN verification is locked out until the given time
    #[error("Too many failed attempts - PIN locked until {until}")]
    Locked { until: DateTime<Utc> },

    /// Supplied PIN did not match
    #[error("Incorrect PIN ({attempts_remaining} attempts remaining)")]
    IncorrectPin { attempts_remaining: u32 },

    /// Biometric session token is past its expiry
    #[error("Biometric session expired - verify your PIN again")]
    ExpiredToken,

    /// Biometric session token is missing, malformed or wrongly signed
    #[error("Invalid biometric session token")]
    InvalidToken,

    /// Reset was requested for an account whose PIN is not locked
    #[error("Account is not locked - no PIN reset needed")]
    NotLocked,

    /// Reset code is unknown, expired or already used
    #[error("Invalid or expired reset code")]
    InvalidOrExpiredCode,

    /// Reset code was issued but could not be sent
    #[error("Reset code issued but the email could not be sent")]
    DeliveryFailed,

    /// Store, hasher or token failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GuardError {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            GuardError::Validation(_) => "VALIDATION_ERROR",
            GuardError::NotAuthenticated => "NOT_AUTHENTICATED",
            GuardError::UserNotFound => "USER_NOT_FOUND",
            GuardError::NotConfigured => "BIOMETRIC_NOT_CONFIGURED",
            GuardError::Locked { .. } => "PIN_LOCKED",
            GuardError::IncorrectPin { .. } => "INCORRECT_PIN",
            GuardError::ExpiredToken => "BIOMETRIC_TOKEN_EXPIRED",
            GuardError::InvalidToken => "BIOMETRIC_TOKEN_INVALID",
            GuardError::NotLocked => "NOT_LOCKED",
            GuardError::InvalidOrExpiredCode => "INVALID_OR_EXPIRED_CODE",
            GuardError::DeliveryFailed => "DELIVERY_FAILED",
            GuardError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        GuardError::Validation(message.into())
    }
}

impl From<StoreError> for GuardError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UserNotFound(_) => GuardError::UserNotFound,
            other => GuardError::Internal(other.to_string()),
        }
    }
}

impl From<HashError> for GuardError {
    fn from(e: HashError) -> Self {
        GuardError::Internal(e.to_string())
    }
}

impl From<MailError> for GuardError {
    fn from(_: MailError) -> Self {
        GuardError::DeliveryFailed
    }
}
