//! authgate developer shell
//!
//! File-backed adapters and a terminal biometric stand-in for driving the
//! authgate core from the command line.

pub mod biometric;
pub mod commands;
pub mod config;
pub mod file_store;

pub use biometric::PromptBiometricGate;
pub use commands::*;
pub use config::{BiometricMode, ShellConfig};
pub use file_store::{FilePreferenceStore, FileSecretStore};
