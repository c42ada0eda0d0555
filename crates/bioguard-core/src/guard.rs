//! Biometric guard - PIN lifecycle and biometric session issuance
//!
//! ALL biometric PIN operations for an already signed-in user go through
//! `BiometricGuard`. Verification follows a small state machine:
//!
//! ```text
//! UNLOCKED --(max_attempts consecutive failures)--> LOCKED
//! LOCKED   --(lock expiry | PIN reset with code)--> UNLOCKED
//! ```
//!
//! A lock is checked before the PIN is compared and again when a correct
//! PIN is committed, so a correct PIN never bypasses it.

use std::future::Future;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, GuardConfig};
use crate::error::{GuardError, Result};
use crate::mailer::{LogMailer, ResetCodeMailer, ResetCodeMessage};
use crate::notify::{SecurityEvent, SecurityNotifier, TracingNotifier};
use crate::pin::{is_common_pin, validate_pin_format, Argon2PinHasher, PinHasher};
use crate::record::{normalize_email, SuccessOutcome, UserSecurityRecord};
use crate::reset::{generate_code, ResetChallenge};
use crate::session::SessionTokenIssuer;
use crate::store::UserStore;
use crate::types::{
    BiometricContext, ChangePinRequest, DisableOutcome, PinConfigured, PinStatus, PinVerified,
    ResetCodeRequest, ResetPinRequest, ResetRequested, SetupPinRequest, VerifyPinRequest,
    VerifyResetCodeRequest,
};

/// PIN setup, verification, reset and biometric session checks
pub struct BiometricGuard {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn PinHasher>,
    tokens: SessionTokenIssuer,
    mailer: Arc<dyn ResetCodeMailer>,
    notifier: Arc<dyn SecurityNotifier>,
    clock: Arc<dyn Clock>,
    config: GuardConfig,
}

/// Builder wiring the guard's collaborators
pub struct GuardBuilder {
    store: Arc<dyn UserStore>,
    session_secret: Zeroizing<Vec<u8>>,
    hasher: Option<Arc<dyn PinHasher>>,
    mailer: Option<Arc<dyn ResetCodeMailer>>,
    notifier: Option<Arc<dyn SecurityNotifier>>,
    clock: Option<Arc<dyn Clock>>,
    config: GuardConfig,
}

impl GuardBuilder {
    /// PIN hasher (default: Argon2id with default cost)
    pub fn hasher(mut self, hasher: Arc<dyn PinHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Reset code transport (default: `LogMailer`)
    pub fn mailer(mut self, mailer: Arc<dyn ResetCodeMailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    /// Security event sink (default: `TracingNotifier`)
    pub fn notifier(mut self, notifier: Arc<dyn SecurityNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Time source (default: `SystemClock`)
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> std::result::Result<BiometricGuard, ConfigError> {
        self.config.validate()?;
        let tokens = SessionTokenIssuer::new(&self.session_secret, self.config.session.clone())?;

        Ok(BiometricGuard {
            store: self.store,
            hasher: self
                .hasher
                .unwrap_or_else(|| Arc::new(Argon2PinHasher::default())),
            tokens,
            mailer: self.mailer.unwrap_or_else(|| Arc::new(LogMailer)),
            notifier: self
                .notifier
                .unwrap_or_else(|| Arc::new(TracingNotifier)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            config: self.config,
        })
    }
}

impl BiometricGuard {
    /// Start building a guard over `store`, signing sessions with `session_secret`
    pub fn builder(store: Arc<dyn UserStore>, session_secret: impl Into<Vec<u8>>) -> GuardBuilder {
        GuardBuilder {
            store,
            session_secret: Zeroizing::new(session_secret.into()),
            hasher: None,
            mailer: None,
            notifier: None,
            clock: None,
            config: GuardConfig::default(),
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Set up (or re-set) the PIN of an authenticated user
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn setup_pin(&self, request: SetupPinRequest) -> Result<PinConfigured> {
        validate_pin_format(&request.pin)?;

        let pin_hash = self.bounded("hash_pin", self.hasher.hash(&request.pin)).await?;
        let now = self.clock.now();
        let record = self
            .bounded("set_pin", self.store.set_pin(request.user_id, pin_hash, now))
            .await?;

        info!("Biometric PIN configured");
        Ok(PinConfigured {
            pin_created_at: record.pin_created_at().unwrap_or(now),
        })
    }

    /// Verify the PIN and issue a biometric session token
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn verify_pin(&self, request: VerifyPinRequest) -> Result<PinVerified> {
        validate_pin_format(&request.pin)?;
        let record = self.check_current_pin(request.user_id, &request.pin).await?;

        let now = self.clock.now();
        let outcome = self
            .bounded(
                "record_successful_attempt",
                self.store.record_successful_attempt(request.user_id, now),
            )
            .await?;
        if let SuccessOutcome::Locked { until } = outcome {
            warn!(%until, "PIN verification refused: locked by a concurrent attempt");
            return Err(GuardError::Locked { until });
        }

        let issued = self
            .tokens
            .issue(request.user_id, record.pin_generation(), now)?;
        info!(expires_at = %issued.expires_at, "PIN verified, biometric session issued");

        Ok(PinVerified {
            biometric_token: issued.token,
            expires_at: issued.expires_at,
        })
    }

    /// Replace the PIN after verifying the current one
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn change_pin(&self, request: ChangePinRequest) -> Result<PinConfigured> {
        validate_pin_format(&request.current_pin)?;
        self.check_current_pin(request.user_id, &request.current_pin)
            .await?;

        validate_pin_format(&request.new_pin)?;
        if request.new_pin == request.current_pin {
            return Err(GuardError::validation(
                "New PIN must be different from the current PIN",
            ));
        }

        let pin_hash = self
            .bounded("hash_pin", self.hasher.hash(&request.new_pin))
            .await?;
        let now = self.clock.now();
        let outcome = self
            .bounded(
                "replace_pin",
                self.store.replace_pin(request.user_id, pin_hash, now),
            )
            .await?;
        if let SuccessOutcome::Locked { until } = outcome {
            warn!(%until, "PIN change refused: locked by a concurrent attempt");
            return Err(GuardError::Locked { until });
        }

        info!("Biometric PIN changed");
        Ok(PinConfigured {
            pin_created_at: now,
        })
    }

    /// Turn biometric access off and forget the PIN
    #[instrument(skip(self))]
    pub async fn disable_biometric(&self, user_id: Uuid) -> Result<DisableOutcome> {
        let changed = self
            .bounded("clear_pin", self.store.clear_pin(user_id))
            .await?;

        if !changed {
            info!("Biometric already disabled");
            return Ok(DisableOutcome::AlreadyDisabled);
        }

        info!("Biometric disabled");
        self.notifier
            .notify(SecurityEvent::BiometricDisabled { user_id })
            .await;
        Ok(DisableOutcome::Disabled)
    }

    /// Current PIN state of a user
    #[instrument(skip(self))]
    pub async fn status(&self, user_id: Uuid) -> Result<PinStatus> {
        let record = self.load_record(user_id).await?;
        let now = self.clock.now();

        let account_age = now.signed_duration_since(record.created_at);
        let requires_setup =
            !record.biometric_enabled() && account_age > self.config.new_account_grace();

        Ok(PinStatus {
            biometric_enabled: record.biometric_enabled(),
            pin_created_at: record.pin_created_at(),
            failed_pin_attempts: record.failed_pin_attempts(),
            is_locked: record.active_lock(now).is_some(),
            pin_locked_until: record.pin_locked_until(),
            requires_setup,
        })
    }

    /// Email a reset code to a user whose PIN is locked
    #[instrument(skip(self, request))]
    pub async fn request_pin_reset(&self, request: ResetCodeRequest) -> Result<ResetRequested> {
        let email = Self::require_email(&request.email)?;
        let now = self.clock.now();
        let accepted = ResetRequested {
            code_expires_in_secs: self.config.reset.code_ttl_secs,
        };

        let record = self
            .bounded("find_by_email", self.store.find_by_email(&email))
            .await?;
        let Some(record) = record.filter(|r| r.active_lock(now).is_some()) else {
            warn!("PIN reset refused: account unknown or not locked");
            if self.config.reset.conceal_lock_state {
                return Ok(accepted);
            }
            return Err(GuardError::NotLocked);
        };
        let user_id = record.user_id;

        let code = Zeroizing::new(generate_code(self.config.reset.code_length));
        let challenge = ResetChallenge::issue(&code, self.config.reset.code_ttl(), now);
        let expires_at = challenge.expires_at;
        self.bounded(
            "save_reset_challenge",
            self.store.save_reset_challenge(user_id, challenge),
        )
        .await?;

        info!(%user_id, %expires_at, "PIN reset code issued");
        self.notifier
            .notify(SecurityEvent::ResetRequested { user_id })
            .await;

        // The code stays valid even if delivery fails
        let message = ResetCodeMessage {
            to: email,
            code: code.as_str().to_owned(),
            expires_at,
        };
        match tokio::time::timeout(
            self.config.operation_timeout(),
            self.mailer.send_reset_code(&message),
        )
        .await
        {
            Ok(Ok(())) => Ok(accepted),
            Ok(Err(e)) => {
                error!(%user_id, error = %e, "Failed to send PIN reset code");
                Err(GuardError::DeliveryFailed)
            }
            Err(_) => {
                error!(%user_id, "Timed out sending PIN reset code");
                Err(GuardError::DeliveryFailed)
            }
        }
    }

    /// Check a reset code without consuming it
    #[instrument(skip(self, request))]
    pub async fn verify_reset_code(&self, request: VerifyResetCodeRequest) -> Result<bool> {
        let email = Self::require_email(&request.email)?;
        let now = self.clock.now();

        let Some(record) = self
            .bounded("find_by_email", self.store.find_by_email(&email))
            .await?
        else {
            return Ok(false);
        };

        let challenge = self
            .bounded(
                "reset_challenge",
                self.store.reset_challenge(record.user_id),
            )
            .await?;

        Ok(challenge.map_or(false, |c| c.accepts(&request.code, now)))
    }

    /// Set a new PIN using an emailed reset code
    #[instrument(skip(self, request))]
    pub async fn reset_pin(&self, request: ResetPinRequest) -> Result<PinConfigured> {
        let email = Self::require_email(&request.email)?;

        let record = self
            .bounded("find_by_email", self.store.find_by_email(&email))
            .await?
            .ok_or(GuardError::InvalidOrExpiredCode)?;
        let user_id = record.user_id;

        let challenge = self
            .bounded("reset_challenge", self.store.reset_challenge(user_id))
            .await?;
        if !challenge.map_or(false, |c| c.accepts(&request.code, self.clock.now())) {
            warn!(%user_id, "PIN reset refused: invalid or expired code");
            return Err(GuardError::InvalidOrExpiredCode);
        }

        validate_pin_format(&request.new_pin)?;
        if is_common_pin(&request.new_pin) {
            return Err(GuardError::validation(
                "PIN is too common - choose a less predictable PIN",
            ));
        }

        let pin_hash = self
            .bounded("hash_pin", self.hasher.hash(&request.new_pin))
            .await?;
        let now = self.clock.now();
        let completed = self
            .bounded(
                "complete_pin_reset",
                self.store
                    .complete_pin_reset(user_id, &request.code, pin_hash, now),
            )
            .await?;
        if !completed {
            // Consumed or expired by a concurrent request
            warn!(%user_id, "PIN reset refused: code no longer valid");
            return Err(GuardError::InvalidOrExpiredCode);
        }

        info!(%user_id, "PIN reset with code");
        self.notifier
            .notify(SecurityEvent::PinReset { user_id })
            .await;
        Ok(PinConfigured {
            pin_created_at: now,
        })
    }

    /// Validate a biometric session token for a protected endpoint
    ///
    /// Besides signature, expiry and payload shape, the user must still have
    /// biometric access enabled with the same PIN the token was issued for.
    #[instrument(skip(self, token))]
    pub async fn authorize_session(&self, token: &str) -> Result<BiometricContext> {
        let claims = self.tokens.verify(token, self.clock.now())?;
        let user_id = claims.user_id()?;

        let record = match self.load_record(user_id).await {
            Ok(record) => record,
            Err(GuardError::UserNotFound) => return Err(GuardError::InvalidToken),
            Err(e) => return Err(e),
        };

        if !record.biometric_enabled() {
            warn!(%user_id, "Biometric session refused: biometric not configured");
            return Err(GuardError::NotConfigured);
        }

        if claims.pin_generation != record.pin_generation() {
            warn!(%user_id, "Biometric session refused: issued before current PIN");
            return Err(GuardError::InvalidToken);
        }

        Ok(BiometricContext {
            user_id,
            biometric_verified: true,
        })
    }

    /// Lock check, then hash comparison, then failure accounting
    ///
    /// Returns the record the PIN was checked against.
    async fn check_current_pin(&self, user_id: Uuid, pin: &str) -> Result<UserSecurityRecord> {
        let record = self.load_record(user_id).await?;

        if let Some(until) = record.active_lock(self.clock.now()) {
            warn!(%until, "PIN verification refused: locked");
            return Err(GuardError::Locked { until });
        }

        let pin_hash = record.pin_hash().ok_or(GuardError::NotConfigured)?;
        if self
            .bounded("verify_pin_hash", self.hasher.verify(pin, pin_hash))
            .await?
        {
            return Ok(record);
        }

        let policy = &self.config.lockout;
        let outcome = self
            .bounded(
                "record_failed_attempt",
                self.store
                    .record_failed_attempt(user_id, policy, self.clock.now()),
            )
            .await?;

        if let Some(until) = outcome.locked_until {
            if outcome.newly_locked {
                warn!(
                    failed_attempts = outcome.failed_attempts,
                    %until,
                    "{}",
                    policy.describe_lockout(outcome.failed_attempts)
                );
                self.notifier
                    .notify(SecurityEvent::PinLocked {
                        user_id,
                        until,
                        failed_attempts: outcome.failed_attempts,
                    })
                    .await;
            }
            return Err(GuardError::Locked { until });
        }

        let attempts_remaining = policy.attempts_remaining(outcome.failed_attempts);
        warn!(
            failed_attempts = outcome.failed_attempts,
            attempts_remaining, "Incorrect PIN"
        );
        Err(GuardError::IncorrectPin { attempts_remaining })
    }

    async fn load_record(&self, user_id: Uuid) -> Result<UserSecurityRecord> {
        self.bounded("load_user", self.store.load(user_id))
            .await?
            .ok_or(GuardError::UserNotFound)
    }

    fn require_email(email: &str) -> Result<String> {
        let email = normalize_email(email);
        if email.is_empty() || !email.contains('@') {
            return Err(GuardError::validation("A valid email is required"));
        }
        Ok(email)
    }

    /// Run a collaborator call under the operation timeout, mapping failures
    async fn bounded<T, E>(
        &self,
        operation: &'static str,
        call: impl Future<Output = std::result::Result<T, E>>,
    ) -> Result<T>
    where
        E: Into<GuardError>,
    {
        match tokio::time::timeout(self.config.operation_timeout(), call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                let err: GuardError = e.into();
                if let GuardError::Internal(cause) = &err {
                    error!(operation, %cause, "Collaborator call failed");
                }
                Err(err)
            }
            Err(_) => {
                error!(
                    operation,
                    timeout_ms = self.config.operation_timeout_ms,
                    "Collaborator call timed out"
                );
                Err(GuardError::Internal(format!("{} timed out", operation)))
            }
        }
    }
}
