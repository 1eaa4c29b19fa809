//! Terminal stand-in for a biometric sensor

use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use authgate_core::{
    AuthContext, BiometricError, BiometricGate, BiometryKind, BiometryState, SecretBytes,
    SecretKey, SecretStore,
};
use tracing::debug;

use crate::config::BiometricMode;

type Input = Arc<Mutex<Box<dyn BufRead + Send>>>;

/// Biometric gate that asks the user to confirm with `y` on a terminal
///
/// A confirmed challenge counts as a match; anything else is a
/// cancellation. With [`BiometricMode::Disabled`] the gate reports the
/// sensor as unavailable and never prompts.
pub struct PromptBiometricGate {
    store: Arc<dyn SecretStore>,
    mode: BiometricMode,
    input: Input,
}

impl PromptBiometricGate {
    /// Gate reading confirmations from stdin
    pub fn new(store: Arc<dyn SecretStore>, mode: BiometricMode) -> Self {
        Self::with_input(store, mode, Box::new(io::BufReader::new(io::stdin())))
    }

    /// Gate reading confirmations from `input`
    pub fn with_input(
        store: Arc<dyn SecretStore>,
        mode: BiometricMode,
        input: Box<dyn BufRead + Send>,
    ) -> Self {
        Self {
            store,
            mode,
            input: Arc::new(Mutex::new(input)),
        }
    }

    async fn confirm(&self, reason: &str) -> Result<(), BiometricError> {
        if self.mode == BiometricMode::Disabled {
            return Err(BiometricError::Unavailable);
        }

        let input = Arc::clone(&self.input);
        let prompt = format!("{} [y/N]: ", reason);
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stderr = io::stderr();
            stderr.write_all(prompt.as_bytes())?;
            stderr.flush()?;

            let mut line = String::new();
            let mut input = input
                .lock()
                .map_err(|_| io::Error::new(io::ErrorKind::Other, "input lock poisoned"))?;
            input.read_line(&mut line)?;
            Ok(line)
        })
        .await
        .map_err(|e| BiometricError::Hardware(e.to_string()))?
        .map_err(|e| BiometricError::Hardware(e.to_string()))?;

        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Ok(()),
            _ => {
                debug!("Biometric prompt declined");
                Err(BiometricError::Cancelled)
            }
        }
    }
}

#[async_trait]
impl BiometricGate for PromptBiometricGate {
    fn state(&self) -> BiometryState {
        match self.mode {
            BiometricMode::Prompt => BiometryState::Available,
            BiometricMode::Disabled => BiometryState::Unavailable,
        }
    }

    fn kind(&self) -> BiometryKind {
        match self.mode {
            BiometricMode::Prompt => BiometryKind::Fingerprint,
            BiometricMode::Disabled => BiometryKind::None,
        }
    }

    async fn challenge(&self, reason: &str) -> Result<bool, BiometricError> {
        self.confirm(reason).await?;
        Ok(true)
    }

    async fn challenge_for_store_access(
        &self,
        key: SecretKey,
        reason: &str,
    ) -> Result<Option<SecretBytes>, BiometricError> {
        self.confirm(reason).await?;
        let context = AuthContext::biometric(reason);
        self.store
            .read(key, Some(&context))
            .await
            .map_err(|e| BiometricError::Hardware(e.to_string()))
    }
}
