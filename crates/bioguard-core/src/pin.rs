//! PIN format rules and secure hashing
//!
//! The PIN re-confirms an already signed-in user before sensitive actions.
//! It is hashed using Argon2id; hashing and verification run on the
//! blocking thread pool so they never stall the async runtime.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use async_trait::async_trait;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::error::GuardError;

/// Exact number of digits in a PIN
pub const PIN_LENGTH: usize = 4;

/// PINs refused when choosing a new PIN through the reset channel
pub const COMMON_PINS: &[&str] = &[
    "0000", "1111", "2222", "3333", "4444", "5555", "6666", "7777", "8888", "9999", "1234",
    "4321", "0123", "9876", "1212", "1122",
];

/// Hashing failures
#[derive(Debug, Error)]
pub enum HashError {
    #[error("Failed to hash PIN: {0}")]
    Hash(String),

    #[error("Invalid stored hash: {0}")]
    InvalidHash(String),

    #[error("Invalid Argon2 parameters: {0}")]
    Params(String),

    #[error("Hashing task failed: {0}")]
    Task(String),
}

/// Validate PIN format: exactly four ASCII digits
pub fn validate_pin_format(pin: &str) -> Result<(), GuardError> {
    if !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(GuardError::validation("PIN must contain only digits"));
    }

    if pin.len() != PIN_LENGTH {
        return Err(GuardError::validation(format!(
            "PIN must be exactly {} digits",
            PIN_LENGTH
        )));
    }

    Ok(())
}

/// Check a PIN against the common-PIN denylist
pub fn is_common_pin(pin: &str) -> bool {
    COMMON_PINS.contains(&pin)
}

/// One-way PIN hashing
#[async_trait]
pub trait PinHasher: Send + Sync {
    /// Hash a PIN into a self-describing hash string
    async fn hash(&self, pin: &str) -> Result<String, HashError>;

    /// Check a PIN against a stored hash
    ///
    /// Returns `Ok(false)` on mismatch; errors are reserved for
    /// unreadable hashes and internal failures.
    async fn verify(&self, pin: &str, hash: &str) -> Result<bool, HashError>;
}

/// Argon2id PIN hasher
#[derive(Clone, Debug)]
pub struct Argon2PinHasher {
    params: Params,
}

impl Default for Argon2PinHasher {
    fn default() -> Self {
        Self {
            params: Params::DEFAULT,
        }
    }
}

impl Argon2PinHasher {
    /// Create a hasher with the default Argon2id cost parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hasher with custom cost parameters
    ///
    /// # Arguments
    /// * `memory_kib` - Memory cost in KiB
    /// * `iterations` - Number of passes
    /// * `parallelism` - Degree of parallelism
    pub fn with_params(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, HashError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| HashError::Params(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(params: Params) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    }
}

#[async_trait]
impl PinHasher for Argon2PinHasher {
    async fn hash(&self, pin: &str) -> Result<String, HashError> {
        let pin_bytes = Zeroizing::new(pin.as_bytes().to_vec());
        let params = self.params.clone();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Self::argon2(params)
                .hash_password(&pin_bytes, &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| HashError::Hash(e.to_string()))
        })
        .await
        .map_err(|e| HashError::Task(e.to_string()))?
    }

    async fn verify(&self, pin: &str, hash: &str) -> Result<bool, HashError> {
        let pin_bytes = Zeroizing::new(pin.as_bytes().to_vec());
        let hash = hash.to_string();
        let params = self.params.clone();

        tokio::task::spawn_blocking(move || {
            let parsed_hash =
                PasswordHash::new(&hash).map_err(|e| HashError::InvalidHash(e.to_string()))?;

            // Constant-time comparison; cost parameters come from the stored hash
            match Self::argon2(params).verify_password(&pin_bytes, &parsed_hash) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(HashError::Hash(e.to_string())),
            }
        })
        .await
        .map_err(|e| HashError::Task(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> Argon2PinHasher {
        Argon2PinHasher::with_params(8, 1, 1).unwrap()
    }

    #[test]
    fn test_pin_validation() {
        // Too short
        assert!(validate_pin_format("123").is_err());

        // Too long
        assert!(validate_pin_format("12345").is_err());

        // Non-digits
        assert!(validate_pin_format("12a4").is_err());
        assert!(validate_pin_format("１２３４").is_err());

        // Empty
        assert!(validate_pin_format("").is_err());

        // Valid
        assert!(validate_pin_format("0420").is_ok());
    }

    #[test]
    fn test_validation_messages() {
        match validate_pin_format("12x4") {
            Err(GuardError::Validation(msg)) => assert_eq!(msg, "PIN must contain only digits"),
            other => panic!("unexpected result: {:?}", other),
        }
        match validate_pin_format("123456") {
            Err(GuardError::Validation(msg)) => assert_eq!(msg, "PIN must be exactly 4 digits"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_common_pins() {
        assert!(is_common_pin("1234"));
        assert!(is_common_pin("0000"));
        assert!(is_common_pin("1111"));
        assert!(!is_common_pin("5678"));
        assert!(!is_common_pin("2580"));
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let hash = hasher.hash("5678").await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("5678", &hash).await.unwrap());
        assert!(!hasher.verify("8765", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_hash_is_salted() {
        let hasher = fast_hasher();
        let first = hasher.hash("5678").await.unwrap();
        let second = hasher.hash("5678").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_verify_rejects_garbage_hash() {
        let hasher = fast_hasher();
        assert!(matches!(
            hasher.verify("5678", "not-a-hash").await,
            Err(HashError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_invalid_params() {
        assert!(Argon2PinHasher::with_params(0, 0, 0).is_err());
    }
}
