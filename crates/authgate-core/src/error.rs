//! Error types for authgate

use thiserror::Error;

/// Result type alias for authgate operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors surfaced by the vault, the lockout policy and their stores
#[derive(Debug, Error)]
pub enum AuthError {
    /// Requested item does not exist
    ///
    /// Read paths collapse this into a default value; it only escapes from
    /// adapters that are asked for something they cannot represent as absent.
    #[error("Item not found")]
    NotFound,

    /// Biometric or access-policy refusal
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Underlying store or hardware failure
    #[error("Secret store unavailable: {0}")]
    StoreUnavailable(String),

    /// Malformed secret or record encoding
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error from a file-backed adapter
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error from a file-backed adapter
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AuthError {
    fn from(e: serde_json::Error) -> Self {
        AuthError::Serialization(e.to_string())
    }
}

/// Outcome of a failed biometric challenge
///
/// The core never branches on the variant; it is kept for caller-facing
/// messaging and logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BiometricError {
    #[error("Biometric challenge cancelled by user")]
    Cancelled,

    #[error("Biometry locked out after too many failed matches")]
    LockedOut,

    #[error("Biometry not available on this device")]
    Unavailable,

    #[error("Biometric hardware error: {0}")]
    Hardware(String),
}
