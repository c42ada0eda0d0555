//! Server configuration

use bioguard_core::{session::MIN_SECRET_LENGTH, GuardConfig, SmtpConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ServerError};

/// Environment variable overriding `session_secret`
pub const SESSION_SECRET_ENV: &str = "BIOGUARD_SESSION_SECRET";

/// Environment variable overriding `access_secret`
pub const ACCESS_SECRET_ENV: &str = "BIOGUARD_ACCESS_SECRET";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Path of the JSON user store
    pub store_path: PathBuf,

    /// HS256 secret for biometric session tokens
    pub session_secret: Option<String>,

    /// HS256 secret for primary access tokens
    pub access_secret: Option<String>,

    /// Lifetime of primary access tokens (seconds)
    pub access_token_ttl_secs: u64,

    /// SMTP relay for reset codes (log mailer when absent)
    pub smtp: Option<SmtpConfig>,

    /// Guard policy
    pub guard: GuardConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            store_path: Self::default_store_path(),
            session_secret: None,
            access_secret: None,
            access_token_ttl_secs: 3600,
            smtp: None,
            guard: GuardConfig::default(),
        }
    }
}

impl ServerConfig {
    fn default_store_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("/var/lib"))
            .join("bioguard")
            .join("users.json")
    }

    /// Platform-appropriate default config file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("bioguard")
            .join("server.json")
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Replace secrets with values from the environment, when set
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(SESSION_SECRET_ENV).ok(),
            std::env::var(ACCESS_SECRET_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, session_secret: Option<String>, access_secret: Option<String>) {
        if let Some(secret) = session_secret.filter(|s| !s.is_empty()) {
            self.session_secret = Some(secret);
        }
        if let Some(secret) = access_secret.filter(|s| !s.is_empty()) {
            self.access_secret = Some(secret);
        }
    }

    pub fn session_secret(&self) -> Result<&str> {
        Self::require_secret(self.session_secret.as_deref(), "session_secret", SESSION_SECRET_ENV)
    }

    pub fn access_secret(&self) -> Result<&str> {
        Self::require_secret(self.access_secret.as_deref(), "access_secret", ACCESS_SECRET_ENV)
    }

    fn require_secret<'a>(secret: Option<&'a str>, field: &str, env: &str) -> Result<&'a str> {
        let secret = secret.ok_or_else(|| {
            ServerError::Config(format!("{} is not set (config file or {})", field, env))
        })?;
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(ServerError::Config(format!(
                "{} must be at least {} bytes",
                field, MIN_SECRET_LENGTH
            )));
        }
        Ok(secret)
    }

    /// Check everything `serve` needs before binding
    pub fn validate(&self) -> Result<()> {
        let session = self.session_secret()?;
        let access = self.access_secret()?;
        if session == access {
            return Err(ServerError::Config(
                "session_secret and access_secret must differ".into(),
            ));
        }
        if self.access_token_ttl_secs == 0 {
            return Err(ServerError::Config(
                "access_token_ttl_secs must be positive".into(),
            ));
        }
        self.guard.validate()?;
        Ok(())
    }
}
