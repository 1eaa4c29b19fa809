//! Passcode entry flow combining the vault and the lockout policy

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::biometric::BiometricGate;
use crate::clock::Clock;
use crate::error::Result;
use crate::lockout::{FailedPinState, LockoutConfig, LockoutPolicy, LockoutStatus};
use crate::passcode::Passcode;
use crate::prefs::{PreferenceFlags, PreferenceStore};
use crate::store::SecretStore;
use crate::vault::CredentialVault;

/// Result of submitting a passcode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Passcode matched; lockout records were reset
    Accepted,
    /// Passcode did not match
    Rejected(FailedPinState),
    /// Entry refused without checking the passcode
    Suspended { remaining_minutes: i64 },
}

/// Authentication manager
///
/// Gates passcode submission on the suspension window, lazily clears an
/// elapsed marker, and wipes all credential state when the policy returns
/// [`FailedPinState::Deleted`].
pub struct AuthManager {
    vault: CredentialVault,
    policy: LockoutPolicy,
}

impl AuthManager {
    /// Build a manager sharing one secret store between vault and policy
    pub fn new(
        store: Arc<dyn SecretStore>,
        biometrics: Arc<dyn BiometricGate>,
        preferences: Arc<dyn PreferenceStore>,
        config: LockoutConfig,
    ) -> Self {
        let vault = CredentialVault::new(
            Arc::clone(&store),
            biometrics,
            PreferenceFlags::new(preferences),
        );
        let policy = LockoutPolicy::new(store, config);
        Self::from_parts(vault, policy)
    }

    /// Same as [`new`](Self::new) with an explicit clock
    pub fn with_clock(
        store: Arc<dyn SecretStore>,
        biometrics: Arc<dyn BiometricGate>,
        preferences: Arc<dyn PreferenceStore>,
        clock: Arc<dyn Clock>,
        config: LockoutConfig,
    ) -> Self {
        let vault = CredentialVault::new(
            Arc::clone(&store),
            biometrics,
            PreferenceFlags::new(preferences),
        );
        let policy = LockoutPolicy::with_clock(store, clock, config);
        Self::from_parts(vault, policy)
    }

    pub fn from_parts(vault: CredentialVault, policy: LockoutPolicy) -> Self {
        Self { vault, policy }
    }

    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// Check a passcode attempt and advance the lockout state
    ///
    /// # Errors
    ///
    /// Store failures propagate. After [`FailedPinState::Deleted`] the
    /// counter and marker are already gone, so an `Err` from this call means
    /// the credential wipe is incomplete; retry it with
    /// [`CredentialVault::wipe_all`].
    pub async fn submit_passcode(&self, attempt: &Passcode) -> Result<AttemptOutcome> {
        let status = self.suspension_status().await?;
        if status.is_suspended() {
            return Ok(AttemptOutcome::Suspended {
                remaining_minutes: status.remaining_minutes,
            });
        }

        if self.vault.validate(attempt).await? {
            self.policy.record_success().await?;
            return Ok(AttemptOutcome::Accepted);
        }

        let state = self.policy.record_failure().await?;
        self.handle_rejection(state).await?;
        Ok(AttemptOutcome::Rejected(state))
    }

    /// Unlock with biometrics; a match resets the lockout records
    pub async fn unlock_with_biometric(&self) -> Result<bool> {
        let unlocked = self.vault.unlock_with_biometric().await?;
        if unlocked {
            self.policy.record_success().await?;
        }
        Ok(unlocked)
    }

    async fn handle_rejection(&self, state: FailedPinState) -> Result<()> {
        match state {
            FailedPinState::Deleted => {
                warn!("Too many failed attempts after suspension; wiping credentials");
                self.vault.wipe_all().await.map_err(|e| {
                    error!("Credential wipe incomplete after lockout: {}", e);
                    e
                })
            }
            FailedPinState::JustSuspended => {
                info!(
                    "Passcode entry suspended for {} minutes",
                    self.policy.config().suspension_secs / 60
                );
                Ok(())
            }
            FailedPinState::CanContinue | FailedPinState::WillSuspend => Ok(()),
        }
    }

    /// Lockout snapshot, clearing the marker of an elapsed window first
    pub async fn suspension_status(&self) -> Result<LockoutStatus> {
        let status = self.policy.status().await?;
        if status.suspended_since.is_some() && status.remaining_minutes <= 0 {
            self.policy.clear_expired_suspension().await?;
            return self.policy.status().await;
        }
        Ok(status)
    }
}
