//! Secret store contract
//!
//! The secret store is the encrypted-at-rest keyed persistence boundary
//! (a platform keychain in production). authgate only depends on the four
//! primitives below; platform adapters own encryption, retries and latency.
//!
//! # Keys
//!
//! Every record authgate persists lives under one of the [`SecretKey`]
//! logical names. Entries written with [`AccessPolicy::BiometryCurrentSet`]
//! must refuse reads that do not carry an [`AuthContext`].

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::Result;

/// Secret material read back from a store, zeroized on drop
pub type SecretBytes = Zeroizing<Vec<u8>>;

/// Logical key names used by authgate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretKey {
    /// The passcode credential
    Passcode,
    /// Biometric-bound copy of the passcode
    BiometricPasscode,
    /// Opaque session token
    SessionToken,
    /// Consecutive failed attempt counter
    FailCounter,
    /// Unix timestamp at which the current suspension began
    SuspensionMarker,
}

impl SecretKey {
    /// Every key authgate may write, in wipe order
    pub const ALL: [SecretKey; 5] = [
        SecretKey::Passcode,
        SecretKey::BiometricPasscode,
        SecretKey::SessionToken,
        SecretKey::FailCounter,
        SecretKey::SuspensionMarker,
    ];

    /// Stable account name for platform stores
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretKey::Passcode => "authgate.passcode",
            SecretKey::BiometricPasscode => "authgate.passcode.biometric",
            SecretKey::SessionToken => "authgate.session_token",
            SecretKey::FailCounter => "authgate.passcode.fail_counter",
            SecretKey::SuspensionMarker => "authgate.passcode.suspended_at",
        }
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access control attached to an entry at creation time
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPolicy {
    /// Readable whenever the device is unlocked
    #[default]
    WhenUnlocked,
    /// Readable only with a fresh biometric match against the currently
    /// enrolled biometry set
    BiometryCurrentSet,
}

/// Evidence of a passed biometric challenge, handed to [`SecretStore::read`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthContext {
    reason: String,
}

impl AuthContext {
    /// Context produced after a successful biometric match
    pub fn biometric(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Prompt text the user was shown
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Keyed, encrypted-at-rest secret store
///
/// Absence is reported through the boolean / `Option` results, never as an
/// error. Errors are reserved for `AccessDenied` and `StoreUnavailable`.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Create an entry. Returns `false` without writing if the key exists.
    async fn create(&self, key: SecretKey, value: &[u8], policy: AccessPolicy) -> Result<bool>;

    /// Read an entry, `None` if absent
    ///
    /// Entries created with [`AccessPolicy::BiometryCurrentSet`] require
    /// `auth` and fail with `AccessDenied` otherwise.
    async fn read(&self, key: SecretKey, auth: Option<&AuthContext>) -> Result<Option<SecretBytes>>;

    /// Overwrite an existing entry, keeping its access policy.
    /// Returns `false` if the key does not exist.
    async fn update(&self, key: SecretKey, value: &[u8]) -> Result<bool>;

    /// Remove an entry. Returns `false` if it was already absent.
    async fn delete(&self, key: SecretKey) -> Result<bool>;
}

/// Create-or-update for records that are rewritten in place
pub(crate) async fn put(
    store: &dyn SecretStore,
    key: SecretKey,
    value: &[u8],
    policy: AccessPolicy,
) -> Result<bool> {
    if store.create(key, value, policy).await? {
        return Ok(true);
    }
    store.update(key, value).await
}
