//! Biometric session gate for endpoints that need a fresh PIN proof

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use bioguard_core::GuardError;
use tracing::debug;

use crate::auth::bearer_token;
use crate::response::ApiError;
use crate::AppState;

/// Alternative header carrying the biometric session token
pub const BIOMETRIC_TOKEN_HEADER: &str = "x-biometric-token";

fn biometric_token(headers: &HeaderMap) -> Option<&str> {
    bearer_token(headers).or_else(|| {
        headers
            .get(BIOMETRIC_TOKEN_HEADER)?
            .to_str()
            .ok()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    })
}

/// Attach a `BiometricContext` or reject the request
pub async fn require_biometric_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = biometric_token(req.headers()).ok_or_else(|| {
        debug!("Biometric session token missing");
        GuardError::InvalidToken
    })?;

    let context = state.guard.authorize_session(token).await?;
    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, HeaderValue};

    #[test]
    fn test_token_sources() {
        let mut headers = HeaderMap::new();
        assert_eq!(biometric_token(&headers), None);

        headers.insert(BIOMETRIC_TOKEN_HEADER, HeaderValue::from_static("from-header"));
        assert_eq!(biometric_token(&headers), Some("from-header"));

        // Bearer wins when both are present
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-bearer"));
        assert_eq!(biometric_token(&headers), Some("from-bearer"));
    }
}
