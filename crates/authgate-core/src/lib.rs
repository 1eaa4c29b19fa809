//! authgate core - local passcode and biometric gating
//!
//! This crate provides:
//! - A passcode credential held in a platform secret store
//! - An optional biometric unlock bound to that credential
//! - A persisted brute-force lockout state machine
//!
//! # Security Model
//!
//! - Secrets live only in the [`SecretStore`]; every comparison reads them fresh
//! - Comparisons are constant time
//! - The biometric copy is readable only after a biometric match and is
//!   dropped whenever the passcode rotates
//! - Counter and suspension updates are serialized per policy instance
//!
//! Platform capabilities (secret store, biometric sensor, preference flags)
//! are injected as trait objects. In-memory versions live in [`memory`].

pub mod biometric;
pub mod clock;
pub mod error;
pub mod lockout;
pub mod manager;
pub mod memory;
pub mod passcode;
pub mod prefs;
pub mod record;
pub mod store;
pub mod vault;

pub use biometric::{BiometricGate, BiometryKind, BiometryState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AuthError, BiometricError, Result};
pub use lockout::{
    FailedPinState, LockoutConfig, LockoutPolicy, LockoutStatus, ALLOWED_PIN_COUNT,
    SUSPENSION_SECONDS,
};
pub use manager::{AttemptOutcome, AuthManager};
pub use passcode::Passcode;
pub use prefs::{PreferenceFlags, PreferenceStore};
pub use store::{AccessPolicy, AuthContext, SecretBytes, SecretKey, SecretStore};
pub use vault::CredentialVault;
