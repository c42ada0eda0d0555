//! Primary session authentication
//!
//! The biometric endpoints sit behind an already signed-in user. Primary
//! access tokens are HS256 JWTs with `type = "access"`, signed with a secret
//! distinct from the biometric session secret, so neither token kind can
//! stand in for the other.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use bioguard_core::{session::MIN_SECRET_LENGTH, GuardError};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, ServerError};
use crate::response::ApiError;
use crate::AppState;

/// Value of the `type` claim of primary access tokens
pub const ACCESS_TOKEN_TYPE: &str = "access";

/// Claims of a primary access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and checks primary access tokens
pub struct AccessTokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl AccessTokenIssuer {
    pub fn new(secret: &[u8], ttl_secs: u64) -> Result<Self> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(ServerError::Config(format!(
                "access secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }
        let ttl_secs = i64::try_from(ttl_secs)
            .map_err(|_| ServerError::Config("access_token_ttl_secs is too large".into()))?;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::seconds(ttl_secs),
        })
    }

    /// Issue an access token for `user_id`
    pub fn issue(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String> {
        let claims = AccessClaims {
            sub: user_id.to_string(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Check an access token against the system clock
    pub fn verify(&self, token: &str) -> std::result::Result<Uuid, GuardError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<AccessClaims>(token, &self.decoding, &validation)
            .map_err(|e| {
                debug!(error = %e, "Access token rejected");
                GuardError::NotAuthenticated
            })?
            .claims;

        if claims.token_type != ACCESS_TOKEN_TYPE {
            debug!(token_type = %claims.token_type, "Access token rejected: wrong type");
            return Err(GuardError::NotAuthenticated);
        }

        Uuid::parse_str(&claims.sub).map_err(|_| GuardError::NotAuthenticated)
    }
}

/// Authenticated user attached by `require_primary_session`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub Uuid);

/// Token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Reject requests without a valid primary access token
pub async fn require_primary_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or(GuardError::NotAuthenticated)?;
    let user_id = state.access.verify(token)?;

    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}
