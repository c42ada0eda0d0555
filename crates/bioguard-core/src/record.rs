//! Per-user security state for biometric PIN access
//!
//! Fields are private so the `biometric_enabled` ⇔ `pin_hash` invariant can
//! only change through the transitions below. Store implementations apply
//! these transitions inside their own critical section.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lockout::LockoutPolicy;

/// Security fields of a user account
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSecurityRecord {
    /// Stable user identifier
    pub user_id: Uuid,
    /// Normalized email address (reset channel only)
    pub email: String,
    /// Account creation time
    pub created_at: DateTime<Utc>,
    /// Argon2id hash of the PIN
    pin_hash: Option<String>,
    /// Whether biometric (PIN) access is enabled
    biometric_enabled: bool,
    /// Consecutive failed verifications
    failed_pin_attempts: u32,
    /// Verification refused until this time
    pin_locked_until: Option<DateTime<Utc>>,
    /// Last time the PIN was (re)configured
    pin_created_at: Option<DateTime<Utc>>,
    /// Bumped on every PIN (re)configuration; session tokens carry it
    #[serde(default)]
    pin_generation: u64,
}

/// Result of recording a failed verification
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttemptOutcome {
    /// Failure count after this attempt
    pub failed_attempts: u32,
    /// Active lock, if any
    pub locked_until: Option<DateTime<Utc>>,
    /// Whether this attempt triggered the lock
    pub newly_locked: bool,
}

/// Result of recording a successful verification
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SuccessOutcome {
    /// Counter and lock cleared
    Cleared,
    /// A lock became active before the success was recorded
    Locked { until: DateTime<Utc> },
}

impl UserSecurityRecord {
    /// Create a record for a new account with biometric access disabled
    pub fn new(email: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            email: normalize_email(email),
            created_at,
            pin_hash: None,
            biometric_enabled: false,
            failed_pin_attempts: 0,
            pin_locked_until: None,
            pin_created_at: None,
            pin_generation: 0,
        }
    }

    pub fn pin_hash(&self) -> Option<&str> {
        self.pin_hash.as_deref()
    }

    pub fn biometric_enabled(&self) -> bool {
        self.biometric_enabled
    }

    pub fn failed_pin_attempts(&self) -> u32 {
        self.failed_pin_attempts
    }

    pub fn pin_locked_until(&self) -> Option<DateTime<Utc>> {
        self.pin_locked_until
    }

    pub fn pin_created_at(&self) -> Option<DateTime<Utc>> {
        self.pin_created_at
    }

    pub fn pin_generation(&self) -> u64 {
        self.pin_generation
    }

    /// The lock end time if the lock is still in force at `now`
    pub fn active_lock(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.pin_locked_until.filter(|&until| until > now)
    }

    /// Install a new PIN hash, enabling biometric access and clearing lockout state
    pub fn configure_pin(&mut self, pin_hash: String, now: DateTime<Utc>) {
        self.pin_hash = Some(pin_hash);
        self.biometric_enabled = true;
        self.failed_pin_attempts = 0;
        self.pin_locked_until = None;
        self.pin_created_at = Some(now);
        self.pin_generation = self.pin_generation.wrapping_add(1);
    }

    /// Install a PIN chosen by a verified change, unless a lock is in force
    ///
    /// A lock applied by a concurrent failed attempt after the current PIN
    /// was checked wins over the change.
    pub fn replace_pin(&mut self, pin_hash: String, now: DateTime<Utc>) -> SuccessOutcome {
        if let Some(until) = self.active_lock(now) {
            return SuccessOutcome::Locked { until };
        }
        self.configure_pin(pin_hash, now);
        SuccessOutcome::Cleared
    }

    /// Remove the PIN and disable biometric access
    ///
    /// Returns `false` if biometric access was already disabled.
    pub fn clear_pin(&mut self) -> bool {
        let changed = self.biometric_enabled || self.pin_hash.is_some();
        self.pin_hash = None;
        self.biometric_enabled = false;
        self.failed_pin_attempts = 0;
        self.pin_locked_until = None;
        self.pin_created_at = None;
        changed
    }

    /// Count a failed verification and lock once the policy threshold is reached
    pub fn apply_failed_attempt(
        &mut self,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> AttemptOutcome {
        // An expired lock restarts the count
        if matches!(self.pin_locked_until, Some(until) if until <= now) {
            self.pin_locked_until = None;
            self.failed_pin_attempts = 0;
        }

        self.failed_pin_attempts = self.failed_pin_attempts.saturating_add(1);

        let mut newly_locked = false;
        if self.pin_locked_until.is_none() && policy.should_lock(self.failed_pin_attempts) {
            self.pin_locked_until = Some(now + policy.lock_duration());
            newly_locked = true;
        }

        AttemptOutcome {
            failed_attempts: self.failed_pin_attempts,
            locked_until: self.active_lock(now),
            newly_locked,
        }
    }

    /// Clear the failure count after a correct PIN, unless a lock is in force
    pub fn apply_successful_attempt(&mut self, now: DateTime<Utc>) -> SuccessOutcome {
        if let Some(until) = self.active_lock(now) {
            return SuccessOutcome::Locked { until };
        }
        self.failed_pin_attempts = 0;
        self.pin_locked_until = None;
        SuccessOutcome::Cleared
    }
}

/// Lowercase and trim an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
