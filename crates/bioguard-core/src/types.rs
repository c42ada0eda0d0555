//! Typed inputs and outcomes of guard operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Set up a PIN for an authenticated user
#[derive(Clone, Deserialize)]
pub struct SetupPinRequest {
    pub user_id: Uuid,
    pub pin: String,
}

/// Verify the PIN of an authenticated user
#[derive(Clone, Deserialize)]
pub struct VerifyPinRequest {
    pub user_id: Uuid,
    pub pin: String,
}

/// Replace the PIN, proving knowledge of the current one
#[derive(Clone, Deserialize)]
pub struct ChangePinRequest {
    pub user_id: Uuid,
    pub current_pin: String,
    pub new_pin: String,
}

/// Ask for a reset code to be emailed
#[derive(Clone, Debug, Deserialize)]
pub struct ResetCodeRequest {
    pub email: String,
}

/// Check a reset code without using it
#[derive(Clone, Deserialize)]
pub struct VerifyResetCodeRequest {
    pub email: String,
    pub code: String,
}

/// Set a new PIN using a reset code
#[derive(Clone, Deserialize)]
pub struct ResetPinRequest {
    pub email: String,
    pub code: String,
    pub new_pin: String,
}

/// A PIN was installed
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinConfigured {
    pub pin_created_at: DateTime<Utc>,
}

/// A PIN was verified and a biometric session issued
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinVerified {
    pub biometric_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Biometric PIN state of a user
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinStatus {
    pub biometric_enabled: bool,
    pub pin_created_at: Option<DateTime<Utc>>,
    pub failed_pin_attempts: u32,
    pub is_locked: bool,
    pub pin_locked_until: Option<DateTime<Utc>>,
    pub requires_setup: bool,
}

/// Result of disabling biometric access
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisableOutcome {
    Disabled,
    AlreadyDisabled,
}

/// A reset request was accepted
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequested {
    pub code_expires_in_secs: u64,
}

/// Identity attached to requests carrying a valid biometric session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BiometricContext {
    pub user_id: Uuid,
    pub biometric_verified: bool,
}
