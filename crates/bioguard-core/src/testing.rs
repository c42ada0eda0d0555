//! Test doubles for the guard's collaborators
//!
//! Used by this crate's tests and by downstream crates that exercise the
//! guard end to end.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

use crate::clock::Clock;
use crate::mailer::{MailError, ResetCodeMailer, ResetCodeMessage};
use crate::notify::{SecurityEvent, SecurityNotifier};
use crate::pin::Argon2PinHasher;

/// Secret long enough for `SessionTokenIssuer`
pub const TEST_SESSION_SECRET: &[u8] = b"bioguard-test-session-secret-0123456789";

/// Argon2id hasher with minimal cost, for tests only
pub fn fast_hasher() -> Argon2PinHasher {
    Argon2PinHasher::with_params(8, 1, 1).expect("minimal Argon2 parameters are valid")
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = *now + by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Mailer that keeps every message it is given
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages sent so far
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Most recent code sent to `email`
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl ResetCodeMailer for RecordingMailer {
    async fn send_reset_code(&self, message: &ResetCodeMessage) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((message.to.clone(), message.code.clone()));
        Ok(())
    }
}

/// Mailer whose transport is always down
#[derive(Debug, Default)]
pub struct FailingMailer;

#[async_trait]
impl ResetCodeMailer for FailingMailer {
    async fn send_reset_code(&self, _message: &ResetCodeMessage) -> Result<(), MailError> {
        Err(MailError::Transport("connection refused".to_string()))
    }
}

/// Notifier that keeps every event
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<SecurityEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl SecurityNotifier for RecordingNotifier {
    async fn notify(&self, event: SecurityEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}
