//! Passcode secret wrapper

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{AuthError, Result};

/// Passcode bytes, zeroized on drop and redacted from `Debug`
#[derive(Clone)]
pub struct Passcode(Zeroizing<Vec<u8>>);

impl Passcode {
    /// Wrap raw passcode bytes. Empty input is rejected.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = Zeroizing::new(bytes.into());
        if bytes.is_empty() {
            return Err(AuthError::InvalidInput("passcode is empty".to_string()));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Constant-time comparison against stored secret bytes
    pub fn matches(&self, stored: &[u8]) -> bool {
        secrets_equal(&self.0, stored)
    }
}

/// Constant-time equality for secret bytes; lengths are not hidden
pub(crate) fn secrets_equal(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

impl TryFrom<&str> for Passcode {
    type Error = AuthError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value.as_bytes())
    }
}

impl fmt::Debug for Passcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passcode(<redacted>)")
    }
}
