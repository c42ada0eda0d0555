//! Lockout policy for brute-force protection
//!
//! A 4-digit PIN has only 10,000 possible values, so verification is locked
//! once the consecutive failure count reaches the threshold:
//!
//! - 1-4 failures: No lockout, remaining attempts reported
//! - 5 failures: 15 minute lockout
//!
//! When the lock expires the counter restarts from zero.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::clock::duration_secs;

/// Lockout policy
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutPolicy {
    /// Consecutive failures that trigger the lock
    pub max_attempts: u32,
    /// How long the lock lasts (in seconds)
    pub lock_duration_secs: u64,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lock_duration_secs: 900, // 15 minutes
        }
    }
}

impl LockoutPolicy {
    /// Create a strict policy (fewer attempts, longer lock)
    pub fn strict() -> Self {
        Self {
            max_attempts: 3,
            lock_duration_secs: 3600, // 1 hour
        }
    }

    /// Create a lenient policy (more attempts allowed)
    pub fn lenient() -> Self {
        Self {
            max_attempts: 10,
            lock_duration_secs: 300, // 5 minutes
        }
    }

    /// Duration of the lock applied when the threshold is reached
    pub fn lock_duration(&self) -> Duration {
        duration_secs(self.lock_duration_secs)
    }

    /// Check if the given failure count triggers the lock
    pub fn should_lock(&self, failed_attempts: u32) -> bool {
        failed_attempts >= self.max_attempts
    }

    /// Attempts left before the lock, floored at zero
    pub fn attempts_remaining(&self, failed_attempts: u32) -> u32 {
        self.max_attempts.saturating_sub(failed_attempts)
    }

    /// Get a human-readable description of the current lockout state
    pub fn describe_lockout(&self, failed_attempts: u32) -> String {
        if self.should_lock(failed_attempts) {
            let secs = self.lock_duration_secs;
            if secs < 60 {
                format!("Locked for {} seconds", secs)
            } else if secs < 3600 {
                format!("Locked for {} minutes", secs / 60)
            } else {
                format!("Locked for {} hours", secs / 3600)
            }
        } else {
            format!(
                "{} attempts remaining",
                self.attempts_remaining(failed_attempts)
            )
        }
    }
}
