//! Delivery of reset codes
//!
//! The guard only hands a `ResetCodeMessage` to a `ResetCodeMailer`; the
//! transport is the caller's choice. `LogMailer` is meant for development
//! and writes the message, code included, to the log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Mail delivery failures
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// A reset code addressed to a user
#[derive(Clone)]
pub struct ResetCodeMessage {
    /// Recipient email
    pub to: String,
    /// The plain code (only ever leaves the process through the mailer)
    pub code: String,
    /// When the code stops being accepted
    pub expires_at: DateTime<Utc>,
}

impl ResetCodeMessage {
    /// Plain-text body shared by the stock mailers
    pub fn body(&self, platform_name: &str) -> String {
        format!(
            "Your {platform} PIN reset code is {code}.\n\n\
             It expires at {expires} UTC and can be used once.\n\
             If you did not request a PIN reset, you can ignore this email.\n",
            platform = platform_name,
            code = self.code,
            expires = self.expires_at.format("%Y-%m-%d %H:%M"),
        )
    }
}

/// Sends reset codes to users
#[async_trait]
pub trait ResetCodeMailer: Send + Sync {
    async fn send_reset_code(&self, message: &ResetCodeMessage) -> Result<(), MailError>;
}

/// Development mailer that writes reset codes to the log
#[derive(Clone, Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl ResetCodeMailer for LogMailer {
    async fn send_reset_code(&self, message: &ResetCodeMessage) -> Result<(), MailError> {
        info!(
            to = %message.to,
            code = %message.code,
            expires_at = %message.expires_at,
            "PIN reset code (log mailer)"
        );
        Ok(())
    }
}

/// SMTP relay settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// Relay host name
    pub host: String,
    /// Relay port
    #[serde(default = "SmtpConfig::default_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender mailbox, e.g. `BioGuard <no-reply@example.com>`
    pub from: String,
    /// Name shown in the message body
    #[serde(default = "SmtpConfig::default_platform_name")]
    pub platform_name: String,
}

impl SmtpConfig {
    fn default_port() -> u16 {
        587
    }

    fn default_platform_name() -> String {
        "BioGuard".to_string()
    }
}

#[cfg(feature = "smtp")]
pub use smtp::SmtpMailer;

#[cfg(feature = "smtp")]
mod smtp {
    use async_trait::async_trait;
    use lettre::{
        message::{header::ContentType, Mailbox},
        transport::smtp::authentication::Credentials,
        AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    };

    use super::{MailError, ResetCodeMailer, ResetCodeMessage, SmtpConfig};

    /// SMTP mailer (STARTTLS relay)
    pub struct SmtpMailer {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: Mailbox,
        platform_name: String,
    }

    impl SmtpMailer {
        pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
            let creds = Credentials::new(config.username.clone(), config.password.clone());

            let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MailError::Transport(e.to_string()))?
                .port(config.port)
                .credentials(creds)
                .build();

            let from: Mailbox = config
                .from
                .parse()
                .map_err(|e| MailError::Address(format!("{}", e)))?;

            Ok(Self {
                transport,
                from,
                platform_name: config.platform_name.clone(),
            })
        }
    }

    #[async_trait]
    impl ResetCodeMailer for SmtpMailer {
        async fn send_reset_code(&self, message: &ResetCodeMessage) -> Result<(), MailError> {
            let to: Mailbox = message
                .to
                .parse()
                .map_err(|e| MailError::Address(format!("{}", e)))?;

            let email = Message::builder()
                .from(self.from.clone())
                .to(to)
                .subject(format!("{} PIN reset code", self.platform_name))
                .header(ContentType::TEXT_PLAIN)
                .body(message.body(&self.platform_name))
                .map_err(|e| MailError::Build(e.to_string()))?;

            self.transport
                .send(email)
                .await
                .map_err(|e| MailError::Transport(e.to_string()))?;

            Ok(())
        }
    }
}
