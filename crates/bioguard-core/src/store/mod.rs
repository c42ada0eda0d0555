//! User store abstraction
//!
//! The guard never reads-then-writes security fields itself. Every state
//! change is one store call that applies a `UserSecurityRecord` transition
//! inside the store's critical section, so parallel requests for the same
//! user cannot skip the lock transition.

mod file;
mod memory;
mod state;

pub use file::JsonFileUserStore;
pub use memory::MemoryUserStore;
pub use state::StoreState;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::lockout::LockoutPolicy;
use crate::record::{AttemptOutcome, SuccessOutcome, UserSecurityRecord};
use crate::reset::ResetChallenge;

/// Store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("User already exists: {0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Persistent storage for user security records and reset challenges
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Load a user's security record
    async fn load(&self, user_id: Uuid) -> Result<Option<UserSecurityRecord>, StoreError>;

    /// Look up a user by normalized email
    async fn find_by_email(&self, email: &str) -> Result<Option<UserSecurityRecord>, StoreError>;

    /// Install a PIN hash, enabling biometric access and clearing lockout state
    async fn set_pin(
        &self,
        user_id: Uuid,
        pin_hash: String,
        now: DateTime<Utc>,
    ) -> Result<UserSecurityRecord, StoreError>;

    /// Atomically install a changed PIN hash unless a lock is in force
    async fn replace_pin(
        &self,
        user_id: Uuid,
        pin_hash: String,
        now: DateTime<Utc>,
    ) -> Result<SuccessOutcome, StoreError>;

    /// Remove the PIN; returns `false` if it was already disabled
    async fn clear_pin(&self, user_id: Uuid) -> Result<bool, StoreError>;

    /// Atomically count a failed verification and apply the lock
    async fn record_failed_attempt(
        &self,
        user_id: Uuid,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<AttemptOutcome, StoreError>;

    /// Atomically clear the failure count unless a lock is in force
    async fn record_successful_attempt(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SuccessOutcome, StoreError>;

    /// Store a reset challenge, replacing any previous one
    async fn save_reset_challenge(
        &self,
        user_id: Uuid,
        challenge: ResetChallenge,
    ) -> Result<(), StoreError>;

    /// Current reset challenge for a user
    async fn reset_challenge(&self, user_id: Uuid) -> Result<Option<ResetChallenge>, StoreError>;

    /// Atomically consume the challenge and install the new PIN hash
    ///
    /// Returns `false`, changing nothing, if `code` is not accepted by the
    /// current challenge.
    async fn complete_pin_reset(
        &self,
        user_id: Uuid,
        code: &str,
        pin_hash: String,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}
