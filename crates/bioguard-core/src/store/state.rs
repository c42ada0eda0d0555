//! In-process store state shared by the memory and file stores

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::StoreError;
use crate::lockout::LockoutPolicy;
use crate::record::{normalize_email, AttemptOutcome, SuccessOutcome, UserSecurityRecord};
use crate::reset::ResetChallenge;

/// Users and their reset challenges
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StoreState {
    users: HashMap<Uuid, UserSecurityRecord>,
    #[serde(default)]
    reset_challenges: HashMap<Uuid, ResetChallenge>,
    /// Format version for future migrations
    #[serde(default = "StoreState::current_version")]
    version: u32,
}

impl StoreState {
    fn current_version() -> u32 {
        1
    }

    pub fn new() -> Self {
        Self {
            version: Self::current_version(),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Add a user; the email must be unique
    pub fn insert_user(&mut self, record: UserSecurityRecord) -> Result<(), StoreError> {
        if self.users.values().any(|u| u.email == record.email) {
            return Err(StoreError::Conflict(record.email));
        }
        if self.users.contains_key(&record.user_id) {
            return Err(StoreError::Conflict(record.user_id.to_string()));
        }
        self.users.insert(record.user_id, record);
        Ok(())
    }

    pub fn load(&self, user_id: Uuid) -> Option<UserSecurityRecord> {
        self.users.get(&user_id).cloned()
    }

    pub fn find_by_email(&self, email: &str) -> Option<UserSecurityRecord> {
        let email = normalize_email(email);
        self.users.values().find(|u| u.email == email).cloned()
    }

    fn user_mut(&mut self, user_id: Uuid) -> Result<&mut UserSecurityRecord, StoreError> {
        self.users
            .get_mut(&user_id)
            .ok_or(StoreError::UserNotFound(user_id))
    }

    pub fn set_pin(
        &mut self,
        user_id: Uuid,
        pin_hash: String,
        now: DateTime<Utc>,
    ) -> Result<UserSecurityRecord, StoreError> {
        let user = self.user_mut(user_id)?;
        user.configure_pin(pin_hash, now);
        Ok(user.clone())
    }

    pub fn replace_pin(
        &mut self,
        user_id: Uuid,
        pin_hash: String,
        now: DateTime<Utc>,
    ) -> Result<SuccessOutcome, StoreError> {
        Ok(self.user_mut(user_id)?.replace_pin(pin_hash, now))
    }

    pub fn clear_pin(&mut self, user_id: Uuid) -> Result<bool, StoreError> {
        let changed = self.user_mut(user_id)?.clear_pin();
        self.reset_challenges.remove(&user_id);
        Ok(changed)
    }

    pub fn record_failed_attempt(
        &mut self,
        user_id: Uuid,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<AttemptOutcome, StoreError> {
        Ok(self.user_mut(user_id)?.apply_failed_attempt(policy, now))
    }

    pub fn record_successful_attempt(
        &mut self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SuccessOutcome, StoreError> {
        Ok(self.user_mut(user_id)?.apply_successful_attempt(now))
    }

    pub fn save_reset_challenge(
        &mut self,
        user_id: Uuid,
        challenge: ResetChallenge,
    ) -> Result<(), StoreError> {
        self.user_mut(user_id)?;
        self.reset_challenges.insert(user_id, challenge);
        Ok(())
    }

    pub fn reset_challenge(&self, user_id: Uuid) -> Option<ResetChallenge> {
        self.reset_challenges.get(&user_id).cloned()
    }

    pub fn complete_pin_reset(
        &mut self,
        user_id: Uuid,
        code: &str,
        pin_hash: String,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.user_mut(user_id)?;

        let Some(challenge) = self.reset_challenges.get_mut(&user_id) else {
            return Ok(false);
        };
        if !challenge.accepts(code, now) {
            return Ok(false);
        }
        challenge.consume();

        self.user_mut(user_id)?.configure_pin(pin_hash, now);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn state_with_user() -> (StoreState, Uuid) {
        let mut state = StoreState::new();
        let record = UserSecurityRecord::new("ada@example.com", Utc::now());
        let user_id = record.user_id;
        state.insert_user(record).unwrap();
        (state, user_id)
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let (mut state, _) = state_with_user();
        let duplicate = UserSecurityRecord::new("ADA@example.com", Utc::now());
        assert!(matches!(state.insert_user(duplicate), Err(StoreError::Conflict(_))));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_find_by_email_normalizes() {
        let (state, user_id) = state_with_user();
        assert_eq!(state.find_by_email(" Ada@Example.com").unwrap().user_id, user_id);
        assert!(state.find_by_email("bob@example.com").is_none());
    }

    #[test]
    fn test_unknown_user() {
        let mut state = StoreState::new();
        let missing = Uuid::new_v4();
        assert!(matches!(
            state.set_pin(missing, "hash".into(), Utc::now()),
            Err(StoreError::UserNotFound(id)) if id == missing
        ));
    }

    #[test]
    fn test_complete_pin_reset_consumes_once() {
        let (mut state, user_id) = state_with_user();
        let now = Utc::now();
        state
            .save_reset_challenge(user_id, ResetChallenge::issue("123456", Duration::minutes(10), now))
            .unwrap();

        assert!(state.complete_pin_reset(user_id, "123456", "hash-1".into(), now).unwrap());
        let user = state.load(user_id).unwrap();
        assert_eq!(user.pin_hash(), Some("hash-1"));
        assert!(user.biometric_enabled());

        // Replay
        assert!(!state.complete_pin_reset(user_id, "123456", "hash-2".into(), now).unwrap());
        assert_eq!(state.load(user_id).unwrap().pin_hash(), Some("hash-1"));
    }

    #[test]
    fn test_complete_pin_reset_wrong_code_changes_nothing() {
        let (mut state, user_id) = state_with_user();
        let now = Utc::now();
        state
            .save_reset_challenge(user_id, ResetChallenge::issue("123456", Duration::minutes(10), now))
            .unwrap();

        assert!(!state.complete_pin_reset(user_id, "654321", "hash".into(), now).unwrap());
        assert!(!state.reset_challenge(user_id).unwrap().consumed);
        assert!(state.load(user_id).unwrap().pin_hash().is_none());
    }

    #[test]
    fn test_clear_pin_drops_challenge() {
        let (mut state, user_id) = state_with_user();
        let now = Utc::now();
        state.set_pin(user_id, "hash".into(), now).unwrap();
        state
            .save_reset_challenge(user_id, ResetChallenge::issue("123456", Duration::minutes(10), now))
            .unwrap();

        assert!(state.clear_pin(user_id).unwrap());
        assert!(state.reset_challenge(user_id).is_none());
    }
}
