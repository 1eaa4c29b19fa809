//! Passcode credential and its biometric-bound copy
//!
//! The passcode lives in the secret store under [`SecretKey::Passcode`].
//! When biometric unlock is enabled, a copy is written under
//! [`SecretKey::BiometricPasscode`] with [`AccessPolicy::BiometryCurrentSet`],
//! so the store only releases it after a biometric match.
//!
//! # Invariants
//!
//! - The biometric copy, if present, equals the current passcode. Rotating
//!   the passcode deletes it; it must be re-enrolled.
//! - The biometric switch flag is off whenever the copy is absent.
//! - Secrets are read fresh for every comparison and never cached.
//!
//! The vault never touches the lockout records; callers pair
//! [`CredentialVault::validate`] with [`LockoutPolicy`](crate::LockoutPolicy).

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::biometric::{BiometricGate, BiometryKind, BiometryState};
use crate::error::{AuthError, Result};
use crate::passcode::{secrets_equal, Passcode};
use crate::prefs::PreferenceFlags;
use crate::store::{self, AccessPolicy, SecretKey, SecretStore};

/// Prompt shown when enrolling biometric unlock
pub const ENROLL_REASON: &str = "Enable biometric unlock";
/// Prompt shown when unlocking with biometrics
pub const UNLOCK_REASON: &str = "Unlock with biometrics";

/// Passcode and biometric credential manager
pub struct CredentialVault {
    store: Arc<dyn SecretStore>,
    gate: Arc<dyn BiometricGate>,
    flags: PreferenceFlags,
}

impl CredentialVault {
    pub fn new(
        store: Arc<dyn SecretStore>,
        gate: Arc<dyn BiometricGate>,
        flags: PreferenceFlags,
    ) -> Self {
        Self { store, gate, flags }
    }

    /// Whether a passcode has been set
    pub fn is_passcode_set(&self) -> bool {
        self.flags.is_passcode_set()
    }

    /// Whether biometric unlock is switched on
    pub fn is_biometric_switch_on(&self) -> bool {
        self.flags.is_biometric_switch_on()
    }

    pub fn biometry_state(&self) -> BiometryState {
        self.gate.state()
    }

    /// Whether the sensor can run a challenge right now
    pub fn is_biometry_available(&self) -> bool {
        self.gate.state() == BiometryState::Available
    }

    pub fn biometry_kind(&self) -> BiometryKind {
        self.gate.kind()
    }

    /// Store the passcode if none exists yet
    ///
    /// Returns `false` when a passcode is already stored; use
    /// [`update_passcode`](Self::update_passcode) to rotate it.
    pub async fn set_passcode(&self, passcode: &Passcode) -> Result<bool> {
        let created = self
            .store
            .create(
                SecretKey::Passcode,
                passcode.as_bytes(),
                AccessPolicy::WhenUnlocked,
            )
            .await?;

        if created {
            self.flags.set_passcode_set(true)?;
            info!("Passcode created");
        } else {
            warn!("Passcode already set; refusing to overwrite");
        }
        Ok(created)
    }

    /// Replace the stored passcode and drop biometric unlock
    pub async fn update_passcode(&self, passcode: &Passcode) -> Result<bool> {
        let updated = self
            .store
            .update(SecretKey::Passcode, passcode.as_bytes())
            .await?;

        if updated {
            info!("Passcode updated");
            self.delete_biometric().await?;
        } else {
            warn!("No passcode to update");
        }
        Ok(updated)
    }

    /// Bind biometric unlock to the current passcode
    ///
    /// Requires an available sensor, a `passcode` equal to the stored one
    /// and a passed challenge. Any previous biometric copy is replaced.
    pub async fn enroll_biometric(&self, passcode: &Passcode) -> Result<bool> {
        let state = self.gate.state();
        if state != BiometryState::Available {
            warn!("Biometric enrollment unavailable: {:?}", state);
            return Ok(false);
        }

        if !self.validate(passcode).await? {
            warn!("Biometric enrollment refused: passcode does not match");
            return Ok(false);
        }

        match self.gate.challenge(ENROLL_REASON).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Biometric enrollment challenge not passed");
                return Ok(false);
            }
            Err(e) => {
                warn!("Biometric enrollment challenge failed: {}", e);
                return Ok(false);
            }
        }

        // Switch goes off before the old copy is dropped and only comes back
        // once the new copy exists
        self.delete_biometric().await?;
        let created = self
            .store
            .create(
                SecretKey::BiometricPasscode,
                passcode.as_bytes(),
                AccessPolicy::BiometryCurrentSet,
            )
            .await?;

        if created {
            self.flags.set_biometric_switch(true)?;
            info!("Biometric unlock enrolled");
        }
        Ok(created)
    }

    /// Compare an attempt against the stored passcode
    ///
    /// A missing passcode never matches. Does not touch lockout state.
    pub async fn validate(&self, attempt: &Passcode) -> Result<bool> {
        let stored = self.store.read(SecretKey::Passcode, None).await?;
        Ok(stored.is_some_and(|stored| attempt.matches(&stored)))
    }

    /// Unlock with a biometric match
    ///
    /// The released copy is checked against the current passcode. Challenge
    /// failures, a missing copy and a stale copy all yield `false`.
    pub async fn unlock_with_biometric(&self) -> Result<bool> {
        let released = match self
            .gate
            .challenge_for_store_access(SecretKey::BiometricPasscode, UNLOCK_REASON)
            .await
        {
            Ok(Some(secret)) => secret,
            Ok(None) => {
                debug!("No biometric credential enrolled");
                return Ok(false);
            }
            Err(e) => {
                warn!("Biometric unlock failed: {}", e);
                return Ok(false);
            }
        };

        let Some(stored) = self.store.read(SecretKey::Passcode, None).await? else {
            warn!("Biometric credential present without a passcode");
            return Ok(false);
        };

        let matches = secrets_equal(&released, &stored);
        if !matches {
            warn!("Biometric credential does not match current passcode");
        }
        Ok(matches)
    }

    /// Remove the biometric copy and switch biometric unlock off
    ///
    /// Idempotent: a missing copy is not an error. The copy is deleted even
    /// if clearing the flag fails; the first failure is returned afterwards.
    pub async fn delete_biometric(&self) -> Result<()> {
        let flag_result = self.flags.set_biometric_switch(false);
        if let Err(e) = &flag_result {
            error!("Failed to clear biometric flag: {}", e);
        }

        match self.store.delete(SecretKey::BiometricPasscode).await {
            Ok(true) => info!("Biometric unlock removed"),
            Ok(false) => {}
            Err(e) => {
                error!("Failed to delete biometric credential: {}", e);
                return flag_result.and(Err(e));
            }
        }
        flag_result
    }

    /// Delete every stored secret and reset both flags
    ///
    /// Every deletion is attempted even if an earlier one fails; the first
    /// failure is returned afterwards.
    pub async fn wipe_all(&self) -> Result<()> {
        let mut first_error: Option<AuthError> = None;

        for key in SecretKey::ALL {
            if let Err(e) = self.store.delete(key).await {
                error!("Failed to delete {}: {}", key, e);
                first_error.get_or_insert(e);
            }
        }

        if let Err(e) = self.flags.set_passcode_set(false) {
            error!("Failed to clear passcode flag: {}", e);
            first_error.get_or_insert(e);
        }
        if let Err(e) = self.flags.set_biometric_switch(false) {
            error!("Failed to clear biometric flag: {}", e);
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("All credential state wiped");
                Ok(())
            }
        }
    }

    /// Store the session token, replacing any previous one
    pub async fn store_session_token(&self, token: &str) -> Result<bool> {
        store::put(
            self.store.as_ref(),
            SecretKey::SessionToken,
            token.as_bytes(),
            AccessPolicy::WhenUnlocked,
        )
        .await
    }

    /// Stored session token, `None` if absent
    pub async fn session_token(&self) -> Result<Option<String>> {
        let Some(bytes) = self.store.read(SecretKey::SessionToken, None).await? else {
            return Ok(None);
        };
        String::from_utf8(bytes.to_vec())
            .map(Some)
            .map_err(|_| AuthError::InvalidInput("session token is not valid UTF-8".to_string()))
    }

    /// Remove the session token. Returns whether one was stored.
    pub async fn delete_session_token(&self) -> Result<bool> {
        self.store.delete(SecretKey::SessionToken).await
    }
}
