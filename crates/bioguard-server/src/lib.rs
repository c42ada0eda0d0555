//! BioGuard server - HTTP surface for biometric PIN re-authentication
//!
//! Exposes the `BiometricGuard` operations over axum:
//! - `/biometric/setup-pin`, `verify-pin`, `status`, `disable`, `change-pin`
//!   behind a primary access token
//! - `/biometric/request-pin-reset`, `verify-code`, `reset-pin` for locked users
//! - `/biometric/session` behind a biometric session token

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod response;
pub mod routes;

pub use auth::{AccessTokenIssuer, AuthUser};
pub use config::ServerConfig;
pub use error::{Result, ServerError};

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use bioguard_core::BiometricGuard;
use std::sync::Arc;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub guard: Arc<BiometricGuard>,
    pub access: Arc<AccessTokenIssuer>,
}

impl AppState {
    pub fn new(guard: BiometricGuard, access: AccessTokenIssuer) -> Self {
        Self {
            guard: Arc::new(guard),
            access: Arc::new(access),
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let primary = Router::new()
        .route("/biometric/setup-pin", post(routes::setup_pin))
        .route("/biometric/verify-pin", post(routes::verify_pin))
        .route("/biometric/status", get(routes::status))
        .route("/biometric/disable", post(routes::disable))
        .route("/biometric/change-pin", post(routes::change_pin))
        .route_layer(from_fn_with_state(
            state.clone(),
            auth::require_primary_session,
        ));

    let biometric = Router::new()
        .route("/biometric/session", get(routes::session))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_biometric_session,
        ));

    let public = Router::new()
        // Health check
        .route("/health", get(routes::health))
        // Forgot-PIN flow
        .route("/biometric/request-pin-reset", post(routes::request_pin_reset))
        .route("/biometric/verify-code", post(routes::verify_code))
        .route("/biometric/reset-pin", post(routes::reset_pin));

    Router::new()
        .merge(primary)
        .merge(biometric)
        .merge(public)
        .with_state(state)
}
