//! BioGuard core - PIN-based biometric re-authentication
//!
//! This crate provides the `BiometricGuard` used to re-confirm an already
//! authenticated user with a short numeric PIN:
//! - PIN setup, verification, change and disable
//! - Lockout after repeated failures
//! - Short-lived biometric session tokens
//! - Email-bound reset codes for locked accounts
//!
//! # Security Model
//!
//! - PINs are hashed using Argon2id and never stored or logged in clear
//! - The failed-attempt counter and lock are updated in one atomic store operation
//! - A lock takes precedence over a correct PIN
//! - Session tokens are rejected once biometric access is disabled
//!
//! # Optional Features
//!
//! - `smtp` - Enable SMTP delivery of reset codes via `lettre`
//! - `testing` - Expose the `testing` module of collaborator test doubles

pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod lockout;
pub mod mailer;
pub mod notify;
pub mod pin;
pub mod record;
pub mod reset;
pub mod session;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use config::{ConfigError, GuardConfig};
pub use error::{GuardError, Result};
pub use guard::{BiometricGuard, GuardBuilder};
pub use lockout::LockoutPolicy;
pub use mailer::{LogMailer, MailError, ResetCodeMailer, ResetCodeMessage, SmtpConfig};
pub use notify::{SecurityEvent, SecurityNotifier, TracingNotifier};
pub use pin::{Argon2PinHasher, HashError, PinHasher, PIN_LENGTH};
pub use record::{AttemptOutcome, SuccessOutcome, UserSecurityRecord};
pub use reset::{ResetChallenge, ResetConfig};
pub use session::{BiometricClaims, IssuedToken, SessionConfig, SessionTokenIssuer};
pub use store::{JsonFileUserStore, MemoryUserStore, StoreError, UserStore};
pub use types::*;

#[cfg(feature = "smtp")]
pub use mailer::SmtpMailer;
