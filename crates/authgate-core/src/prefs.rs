//! Boolean UI preference flags
//!
//! Kept outside the secret store: these flags only drive presentation
//! ("show the biometric switch as on") and carry no secret material.

use std::sync::Arc;

use crate::error::Result;

/// Flag recording that a passcode has been created
pub const PASSCODE_SET_FLAG: &str = "authgate.passcode_set";
/// Flag recording that the biometric unlock switch is on
pub const BIOMETRIC_SWITCH_FLAG: &str = "authgate.biometric_switch";

/// Key/value persistence for boolean flags
pub trait PreferenceStore: Send + Sync {
    /// Stored value, `None` if never written
    fn get(&self, key: &str) -> Result<Option<bool>>;

    fn set(&self, key: &str, value: bool) -> Result<()>;
}

/// Typed accessors over a [`PreferenceStore`]
#[derive(Clone)]
pub struct PreferenceFlags {
    store: Arc<dyn PreferenceStore>,
}

impl PreferenceFlags {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// Whether a passcode has been set (defaults to false)
    pub fn is_passcode_set(&self) -> bool {
        self.flag(PASSCODE_SET_FLAG)
    }

    pub fn set_passcode_set(&self, value: bool) -> Result<()> {
        self.store.set(PASSCODE_SET_FLAG, value)
    }

    /// Whether the biometric unlock switch is on (defaults to false)
    pub fn is_biometric_switch_on(&self) -> bool {
        self.flag(BIOMETRIC_SWITCH_FLAG)
    }

    pub fn set_biometric_switch(&self, value: bool) -> Result<()> {
        self.store.set(BIOMETRIC_SWITCH_FLAG, value)
    }

    fn flag(&self, key: &str) -> bool {
        match self.store.get(key) {
            Ok(value) => value.unwrap_or(false),
            Err(e) => {
                tracing::warn!("Failed to read preference {}: {}", key, e);
                false
            }
        }
    }
}
