//! JSON file user store
//!
//! The whole state lives in one JSON file. Every mutation is applied to a
//! copy, written atomically (temp file + rename) and only then committed in
//! memory, all under one mutex.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{StoreError, StoreState, UserStore};
use crate::lockout::LockoutPolicy;
use crate::record::{AttemptOutcome, SuccessOutcome, UserSecurityRecord};
use crate::reset::ResetChallenge;

/// Single-node persistent user store
#[derive(Debug)]
pub struct JsonFileUserStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl JsonFileUserStore {
    /// Open the store at `path`, creating parent directories as needed
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Load existing state if present
        let state = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            StoreState::new()
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an account with biometric access disabled
    pub async fn register_user(
        &self,
        email: &str,
        created_at: DateTime<Utc>,
    ) -> Result<UserSecurityRecord, StoreError> {
        let record = UserSecurityRecord::new(email, created_at);
        let inserted = record.clone();
        self.mutate(move |state| state.insert_user(inserted)).await?;
        Ok(record)
    }

    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut StoreState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let value = f(&mut next)?;
        self.persist(&next)?;
        *state = next;
        Ok(value)
    }

    fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(state)?;

        // Write atomically
        let temp_path = self.temp_path();
        let mut file = Self::create_private(&temp_path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, &self.path)?;

        debug!(path = %self.path.display(), users = state.len(), "user store persisted");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    /// Create `path` readable by the owner only (Unix), replacing any leftover file
    fn create_private(path: &Path) -> Result<fs::File, StoreError> {
        // A leftover temp file would keep its old mode
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        Ok(options.open(path)?)
    }
}

#[async_trait]
impl UserStore for JsonFileUserStore {
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
        self.mutate(move |state| state.set_pin(user_id, pin_hash, now))
            .await
    }

    async fn replace_pin(
        &self,
        user_id: Uuid,
        pin_hash: String,
        now: DateTime<Utc>,
    ) -> Result<SuccessOutcome, StoreError> {
        self.mutate(move |state| state.replace_pin(user_id, pin_hash, now))
            .await
    }

    async fn clear_pin(&self, user_id: Uuid) -> Result<bool, StoreError> {
        self.mutate(move |state| state.clear_pin(user_id)).await
    }

    async fn record_failed_attempt(
        &self,
        user_id: Uuid,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<AttemptOutcome, StoreError> {
        self.mutate(move |state| state.record_failed_attempt(user_id, policy, now))
            .await
    }

    async fn record_successful_attempt(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SuccessOutcome, StoreError> {
        self.mutate(move |state| state.record_successful_attempt(user_id, now))
            .await
    }

    async fn save_reset_challenge(
        &self,
        user_id: Uuid,
        challenge: ResetChallenge,
    ) -> Result<(), StoreError> {
        self.mutate(move |state| state.save_reset_challenge(user_id, challenge))
            .await
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
        self.mutate(move |state| state.complete_pin_reset(user_id, code, pin_hash, now))
            .await
    }
}
