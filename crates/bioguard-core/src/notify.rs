//! Security events for administrators
//!
//! The guard reports lockouts and PIN lifecycle changes to a
//! `SecurityNotifier`. Delivery is best effort and never fails an operation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Security-relevant PIN events
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SecurityEvent {
    /// Too many failed verifications
    PinLocked {
        user_id: Uuid,
        until: DateTime<Utc>,
        failed_attempts: u32,
    },
    /// A reset code was issued
    ResetRequested { user_id: Uuid },
    /// The PIN was replaced through the reset channel
    PinReset { user_id: Uuid },
    /// Biometric access was turned off
    BiometricDisabled { user_id: Uuid },
}

impl SecurityEvent {
    pub fn user_id(&self) -> Uuid {
        match self {
            SecurityEvent::PinLocked { user_id, .. }
            | SecurityEvent::ResetRequested { user_id }
            | SecurityEvent::PinReset { user_id }
            | SecurityEvent::BiometricDisabled { user_id } => *user_id,
        }
    }
}

/// Receives security events
#[async_trait]
pub trait SecurityNotifier: Send + Sync {
    async fn notify(&self, event: SecurityEvent);
}

/// Notifier that records events in the log
#[derive(Clone, Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl SecurityNotifier for TracingNotifier {
    async fn notify(&self, event: SecurityEvent) {
        match &event {
            SecurityEvent::PinLocked {
                user_id,
                until,
                failed_attempts,
            } => warn!(%user_id, %until, failed_attempts, "security event: PIN locked"),
            SecurityEvent::ResetRequested { user_id } => {
                info!(%user_id, "security event: PIN reset requested")
            }
            SecurityEvent::PinReset { user_id } => info!(%user_id, "security event: PIN reset"),
            SecurityEvent::BiometricDisabled { user_id } => {
                info!(%user_id, "security event: biometric disabled")
            }
        }
    }
}
