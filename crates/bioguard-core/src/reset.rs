//! Reset codes for the forgot-PIN channel
//!
//! A code is only issued for a locked account, delivered by email and
//! accepted once. Only a SHA-256 digest of the code is kept.

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, Rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::clock::duration_secs;

/// Reset channel configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetConfig {
    /// Code lifetime (in seconds)
    pub code_ttl_secs: u64,
    /// Number of digits in a code
    pub code_length: u32,
    /// Answer reset requests for unlocked or unknown accounts exactly like
    /// a real issuance instead of refusing them
    pub conceal_lock_state: bool,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: 600, // 10 minutes
            code_length: 6,
            conceal_lock_state: false,
        }
    }
}

impl ResetConfig {
    pub fn code_ttl(&self) -> Duration {
        duration_secs(self.code_ttl_secs)
    }
}

/// Single-use reset code bound to one user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetChallenge {
    /// Hex SHA-256 of the code
    code_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
}

impl ResetChallenge {
    /// Create a challenge for `code` valid for `ttl` from `now`
    pub fn issue(code: &str, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            code_hash: hash_code(code),
            issued_at: now,
            expires_at: now + ttl,
            consumed: false,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Check a submitted code: matching, unexpired and unused
    pub fn accepts(&self, code: &str, now: DateTime<Utc>) -> bool {
        !self.consumed && !self.is_expired(now) && hash_code(code.trim()) == self.code_hash
    }

    /// Mark the challenge as used
    pub fn consume(&mut self) {
        self.consumed = true;
    }
}

/// Generate a numeric code of `length` digits (leading zeros allowed)
pub fn generate_code(length: u32) -> String {
    let mut rng = OsRng;
    (0..length.max(1))
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}
