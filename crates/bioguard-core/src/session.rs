//! Biometric session tokens
//!
//! A successful PIN verification yields a signed HS256 token that proves a
//! fresh biometric check. It has its own short lifetime, independent of the
//! primary login session, and is checked against the injected clock.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::duration_secs;
use crate::config::ConfigError;
use crate::error::GuardError;

/// Value of the `type` claim in biometric session tokens
pub const BIOMETRIC_SESSION_TYPE: &str = "biometric_session";

/// Minimum signing secret length in bytes
pub const MIN_SECRET_LENGTH: usize = 32;

/// Session token configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Token lifetime (in seconds)
    pub ttl_secs: u64,
    /// Value of the `iss` claim
    pub issuer: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 8 * 3600, // 8 hours
            issuer: "bioguard".to_string(),
        }
    }
}

impl SessionConfig {
    /// Create a stricter configuration for high-security environments
    pub fn strict() -> Self {
        Self {
            ttl_secs: 900, // 15 minutes
            ..Self::default()
        }
    }

    pub fn ttl(&self) -> Duration {
        duration_secs(self.ttl_secs)
    }
}

/// Claims carried by a biometric session token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiometricClaims {
    /// User ID
    pub sub: String,
    /// Always `true` for biometric sessions
    #[serde(default)]
    pub biometric: bool,
    /// Always `biometric_session`
    #[serde(rename = "type", default)]
    pub token_type: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    /// Token ID
    pub jti: String,
    /// PIN generation the token was issued for
    pub pin_generation: u64,
}

impl BiometricClaims {
    /// Whether the payload has the biometric session shape
    pub fn is_biometric_session(&self) -> bool {
        self.biometric && self.token_type == BIOMETRIC_SESSION_TYPE
    }

    /// Parse the subject as a user ID
    pub fn user_id(&self) -> Result<Uuid, GuardError> {
        Uuid::parse_str(&self.sub).map_err(|_| GuardError::InvalidToken)
    }
}

/// A freshly signed token
#[derive(Clone, Debug)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies biometric session tokens
#[derive(Clone)]
pub struct SessionTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    config: SessionConfig,
}

impl SessionTokenIssuer {
    /// Create an issuer from a shared secret of at least 32 bytes
    pub fn new(secret: &[u8], config: SessionConfig) -> Result<Self, ConfigError> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "session secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Issue a biometric session token for `user_id`, bound to its current PIN
    pub fn issue(
        &self,
        user_id: Uuid,
        pin_generation: u64,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, GuardError> {
        let expires_at = now + self.config.ttl();
        let claims = BiometricClaims {
            sub: user_id.to_string(),
            biometric: true,
            token_type: BIOMETRIC_SESSION_TYPE.to_string(),
            iss: self.config.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
            pin_generation,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| GuardError::Internal(format!("Token creation failed: {}", e)))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify signature, expiry and payload shape
    ///
    /// Expired tokens yield `ExpiredToken`; every other defect yields
    /// `InvalidToken`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<BiometricClaims, GuardError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against the injected clock
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.set_issuer(&[self.config.issuer.as_str()]);

        let claims = decode::<BiometricClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| GuardError::InvalidToken)?;

        if claims.exp <= now.timestamp() {
            return Err(GuardError::ExpiredToken);
        }

        if !claims.is_biometric_session() {
            return Err(GuardError::InvalidToken);
        }

        Ok(claims)
    }
}
