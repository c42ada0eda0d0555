//! Guard configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::clock::duration_secs;
use crate::lockout::LockoutPolicy;
use crate::reset::ResetConfig;
use crate::session::SessionConfig;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Policy knobs for `BiometricGuard`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Failed-attempt lockout
    pub lockout: LockoutPolicy,

    /// Biometric session tokens
    pub session: SessionConfig,

    /// Forgot-PIN reset codes
    pub reset: ResetConfig,

    /// Accounts younger than this are not asked to set up a PIN (seconds)
    pub new_account_grace_secs: u64,

    /// Upper bound for each store, hasher or mailer call (milliseconds)
    pub operation_timeout_ms: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            lockout: LockoutPolicy::default(),
            session: SessionConfig::default(),
            reset: ResetConfig::default(),
            new_account_grace_secs: 3600,
            operation_timeout_ms: 5000,
        }
    }
}

impl GuardConfig {
    pub fn new_account_grace(&self) -> chrono::Duration {
        duration_secs(self.new_account_grace_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Reject settings that would disable a protection
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lockout.max_attempts == 0 {
            return Err(ConfigError::Invalid("lockout.max_attempts must be at least 1".into()));
        }
        if self.lockout.lock_duration_secs == 0 {
            return Err(ConfigError::Invalid("lockout.lock_duration_secs must be positive".into()));
        }
        if self.session.ttl_secs == 0 {
            return Err(ConfigError::Invalid("session.ttl_secs must be positive".into()));
        }
        if self.reset.code_ttl_secs == 0 {
            return Err(ConfigError::Invalid("reset.code_ttl_secs must be positive".into()));
        }
        if !(4..=10).contains(&self.reset.code_length) {
            return Err(ConfigError::Invalid("reset.code_length must be between 4 and 10".into()));
        }
        if self.operation_timeout_ms == 0 {
            return Err(ConfigError::Invalid("operation_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = GuardConfig::default();
        assert_eq!(config.lockout.max_attempts, 5);
        assert_eq!(config.lockout.lock_duration_secs, 900);
        assert_eq!(config.session.ttl_secs, 28_800);
        assert_eq!(config.reset.code_ttl_secs, 600);
        assert_eq!(config.new_account_grace().num_hours(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: GuardConfig =
            serde_json::from_str(r#"{"lockout": {"max_attempts": 3}, "reset": {"conceal_lock_state": true}}"#)
                .unwrap();
        assert_eq!(config.lockout.max_attempts, 3);
        assert_eq!(config.lockout.lock_duration_secs, 900);
        assert!(config.reset.conceal_lock_state);
        assert_eq!(config.reset.code_length, 6);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("guard.json");

        let mut config = GuardConfig::default();
        config.session.ttl_secs = 600;
        config.save(&path).unwrap();

        let loaded = GuardConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = GuardConfig::default();
        config.lockout.max_attempts = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
