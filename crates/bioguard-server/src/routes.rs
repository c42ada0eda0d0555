//! HTTP handlers for the biometric endpoints

use axum::{extract::State, response::IntoResponse, Extension, Json};
use bioguard_core::{
    BiometricContext, ChangePinRequest, DisableOutcome, GuardError, ResetCodeRequest,
    ResetPinRequest, SetupPinRequest, VerifyPinRequest, VerifyResetCodeRequest,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::response::{success, ApiError, ApiJson};
use crate::AppState;

type ApiResult = Result<Json<Value>, ApiError>;

#[derive(Deserialize)]
pub struct PinBody {
    pin: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePinBody {
    current_pin: String,
    new_pin: String,
}

#[derive(Deserialize)]
pub struct EmailBody {
    email: String,
}

#[derive(Deserialize)]
pub struct CodeBody {
    email: String,
    code: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPinBody {
    email: String,
    code: String,
    new_pin: String,
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn setup_pin(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    ApiJson(body): ApiJson<PinBody>,
) -> ApiResult {
    let configured = state
        .guard
        .setup_pin(SetupPinRequest {
            user_id,
            pin: body.pin,
        })
        .await?;
    success("Biometric PIN set up successfully", configured)
}

pub async fn verify_pin(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    ApiJson(body): ApiJson<PinBody>,
) -> ApiResult {
    let verified = state
        .guard
        .verify_pin(VerifyPinRequest {
            user_id,
            pin: body.pin,
        })
        .await?;
    success("PIN verified", verified)
}

pub async fn status(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> ApiResult {
    let status = state.guard.status(user_id).await?;
    success("Biometric status", status)
}

pub async fn disable(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> ApiResult {
    let message = match state.guard.disable_biometric(user_id).await? {
        DisableOutcome::Disabled => "Biometric authentication disabled",
        DisableOutcome::AlreadyDisabled => "Biometric authentication already disabled",
    };
    success(message, ())
}

pub async fn change_pin(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    ApiJson(body): ApiJson<ChangePinBody>,
) -> ApiResult {
    let configured = state
        .guard
        .change_pin(ChangePinRequest {
            user_id,
            current_pin: body.current_pin,
            new_pin: body.new_pin,
        })
        .await?;
    success("PIN changed successfully", configured)
}

pub async fn request_pin_reset(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<EmailBody>,
) -> ApiResult {
    let requested = state
        .guard
        .request_pin_reset(ResetCodeRequest { email: body.email })
        .await?;
    success("Reset code sent to your email", requested)
}

pub async fn verify_code(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CodeBody>,
) -> ApiResult {
    let valid = state
        .guard
        .verify_reset_code(VerifyResetCodeRequest {
            email: body.email,
            code: body.code,
        })
        .await?;
    if !valid {
        return Err(GuardError::InvalidOrExpiredCode.into());
    }
    success("Reset code is valid", json!({ "valid": true }))
}

pub async fn reset_pin(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResetPinBody>,
) -> ApiResult {
    let configured = state
        .guard
        .reset_pin(ResetPinRequest {
            email: body.email,
            code: body.code,
            new_pin: body.new_pin,
        })
        .await?;
    success("PIN reset successfully", configured)
}

pub async fn session(Extension(context): Extension<BiometricContext>) -> ApiResult {
    success("Biometric session is valid", context)
}
