//! Biometric gate contract
//!
//! Abstracts the platform face/fingerprint sensor. Implementations decide
//! how a challenge is presented; authgate only consumes the yes/no result
//! and, for the scoped variant, the secret released by the store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BiometricError;
use crate::store::{SecretBytes, SecretKey};

/// Sensor capability as reported by the platform
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiometryState {
    /// Sensor enrolled and usable
    Available,
    /// Temporarily locked after repeated failed matches
    Locked,
    /// No sensor, nothing enrolled, or permission withheld
    Unavailable,
}

/// Kind of sensor present on the device
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiometryKind {
    #[default]
    None,
    Face,
    Fingerprint,
}

impl BiometryKind {
    /// Icon name used by app shells for the biometric button
    pub fn icon_name(&self) -> &'static str {
        match self {
            BiometryKind::Face => "ic_face_id",
            BiometryKind::Fingerprint | BiometryKind::None => "ic_touch_id",
        }
    }
}

/// Platform biometric sensor
#[async_trait]
pub trait BiometricGate: Send + Sync {
    /// Current capability of the sensor
    fn state(&self) -> BiometryState;

    /// Sensor kind, for presentation only
    fn kind(&self) -> BiometryKind {
        BiometryKind::None
    }

    /// Run a single yes/no challenge
    async fn challenge(&self, reason: &str) -> Result<bool, BiometricError>;

    /// Run a challenge scoped to reading one store entry
    ///
    /// Returns the entry on a match, `None` if the entry does not exist.
    async fn challenge_for_store_access(
        &self,
        key: SecretKey,
        reason: &str,
    ) -> Result<Option<SecretBytes>, BiometricError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_names() {
        assert_eq!(BiometryKind::Face.icon_name(), "ic_face_id");
        assert_eq!(BiometryKind::Fingerprint.icon_name(), "ic_touch_id");
        assert_eq!(BiometryKind::None.icon_name(), "ic_touch_id");
    }
}
