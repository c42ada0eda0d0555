//! In-memory user store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{StoreError, StoreState, UserStore};
use crate::lockout::LockoutPolicy;
use crate::record::{AttemptOutcome, SuccessOutcome, UserSecurityRecord};
use crate::reset::ResetChallenge;

/// Volatile user store for tests and development
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    state: Mutex<StoreState>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::new()),
        }
    }

    /// Create an account with biometric access disabled
    pub async fn register_user(
        &self,
        email: &str,
        created_at: DateTime<Utc>,
    ) -> Result<UserSecurityRecord, StoreError> {
        let record = UserSecurityRecord::new(email, created_at);
        self.state.lock().await.insert_user(record.clone())?;
        Ok(record)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn load(&self, user_id: Uuid) -> Result<Option<UserSecurityRecord>, StoreError> {
        Ok(self.state.lock().await.load(user_id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserSecurityRecord>, StoreError> {
        Ok(self.state.lock().await.find_by_email(email))
    }

    async fn set_pin(
        &self,
        user_id: Uuid,
        pin_hash: String,
        now: DateTime<Utc>,
    ) -> Result<UserSecurityRecord, StoreError> {
        self.state.lock().await.set_pin(user_id, pin_hash, now)
    }

    async fn replace_pin(
        &self,
        user_id: Uuid,
        pin_hash: String,
        now: DateTime<Utc>,
    ) -> Result<SuccessOutcome, StoreError> {
        self.state.lock().await.replace_pin(user_id, pin_hash, now)
    }

    async fn clear_pin(&self, user_id: Uuid) -> Result<bool, StoreError> {
        self.state.lock().await.clear_pin(user_id)
    }

    async fn record_failed_attempt(
        &self,
        user_id: Uuid,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<AttemptOutcome, StoreError> {
        self.state
            .lock()
            .await
            .record_failed_attempt(user_id, policy, now)
    }

    async fn record_successful_attempt(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SuccessOutcome, StoreError> {
        self.state.lock().await.record_successful_attempt(user_id, now)
    }

    async fn save_reset_challenge(
        &self,
        user_id: Uuid,
        challenge: ResetChallenge,
    ) -> Result<(), StoreError> {
        self.state
            .lock()
            .await
            .save_reset_challenge(user_id, challenge)
    }

    async fn reset_challenge(&self, user_id: Uuid) -> Result<Option<ResetChallenge>, StoreError> {
        Ok(self.state.lock().await.reset_challenge(user_id))
    }

    async fn complete_pin_reset(
        &self,
        user_id: Uuid,
        code: &str,
        pin_hash: String,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.state
            .lock()
            .await
            .complete_pin_reset(user_id, code, pin_hash, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_register_and_load() {
        let store = MemoryUserStore::new();
        let record = store.register_user("ada@example.com", Utc::now()).await.unwrap();

        let loaded = store.load(record.user_id).await.unwrap().unwrap();
        assert_eq!(loaded, record);
        assert!(store.load(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_parallel_failures_lock_exactly_once() {
        let store = Arc::new(MemoryUserStore::new());
        let user_id = store
            .register_user("ada@example.com", Utc::now())
            .await
            .unwrap()
            .user_id;
        let policy = LockoutPolicy::default();
        let now = Utc::now();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            let policy = policy.clone();
            handles.push(tokio::spawn(async move {
                store.record_failed_attempt(user_id, &policy, now).await.unwrap()
            }));
        }

        let mut newly_locked = 0;
        for handle in handles {
            if handle.await.unwrap().newly_locked {
                newly_locked += 1;
            }
        }

        assert_eq!(newly_locked, 1);
        let record = store.load(user_id).await.unwrap().unwrap();
        assert_eq!(record.failed_pin_attempts(), 10);
        assert_eq!(record.pin_locked_until(), Some(now + policy.lock_duration()));
    }
}
