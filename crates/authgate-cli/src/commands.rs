//! CLI command implementations

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use authgate_core::{AttemptOutcome, AuthManager, FailedPinState, LockoutStatus, Passcode};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::biometric::PromptBiometricGate;
use crate::config::ShellConfig;
use crate::file_store::{FilePreferenceStore, FileSecretStore};

/// authgate - local passcode and biometric gate
#[derive(Parser)]
#[command(name = "authgate")]
#[command(about = "Developer shell for the authgate passcode vault and lockout policy")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the shell configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show credential, biometric and lockout state
    Status,

    /// Set the passcode for the first time
    Set {
        /// New passcode
        passcode: String,
    },

    /// Replace the passcode after verifying the current one
    Change {
        /// Current passcode
        current: String,

        /// New passcode
        new: String,
    },

    /// Submit a passcode attempt
    Verify {
        /// Passcode attempt
        passcode: String,
    },

    /// Enable biometric unlock
    EnrollBiometric {
        /// Current passcode
        passcode: String,
    },

    /// Unlock with biometrics
    UnlockBiometric,

    /// Disable biometric unlock
    DisableBiometric,

    /// Session token commands
    #[command(subcommand)]
    Token(TokenCommands),

    /// Delete every stored credential and reset the flags
    Wipe {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Store a session token, replacing any existing one
    Set {
        /// Token value
        token: String,
    },

    /// Print the stored session token
    Get,

    /// Delete the stored session token
    Delete,
}

/// Wire the file-backed stores and prompt gate into a manager
pub fn build_manager(config: &ShellConfig) -> anyhow::Result<AuthManager> {
    config.ensure_directories()?;

    let store = Arc::new(
        FileSecretStore::open(&config.store_path)
            .with_context(|| format!("opening secret store {}", config.store_path.display()))?,
    );
    let preferences = Arc::new(
        FilePreferenceStore::open(&config.preferences_path).with_context(|| {
            format!(
                "opening preferences {}",
                config.preferences_path.display()
            )
        })?,
    );
    let gate = Arc::new(PromptBiometricGate::new(store.clone(), config.biometric));

    Ok(AuthManager::new(
        store,
        gate,
        preferences,
        config.lockout.clone(),
    ))
}

/// Run one command against `manager`, printing results to `out`
pub async fn execute<W: Write>(
    manager: &AuthManager,
    command: Commands,
    out: &mut W,
) -> anyhow::Result<()> {
    let vault = manager.vault();

    match command {
        Commands::Status => {
            let status = manager.suspension_status().await?;
            writeln!(out, "Passcode set: {}", yes_no(vault.is_passcode_set()))?;
            writeln!(
                out,
                "Biometric unlock: {}",
                if vault.is_biometric_switch_on() { "on" } else { "off" }
            )?;
            writeln!(
                out,
                "Biometry: {:?} ({:?})",
                vault.biometry_state(),
                vault.biometry_kind()
            )?;
            writeln!(
                out,
                "Failed attempts: {}/{}",
                status.failed_attempts, status.allowed_attempts
            )?;
            if let Some(since) = status.suspended_since {
                let started = chrono::DateTime::from_timestamp(since, 0)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| since.to_string());
                writeln!(out, "Suspension started: {}", started)?;
            }
            writeln!(out, "Lockout: {}", status.describe())?;
        }

        Commands::Set { passcode } => {
            if !vault.set_passcode(&Passcode::try_from(passcode.as_str())?).await? {
                bail!("A passcode is already set; use `authgate change`");
            }
            writeln!(out, "✓ Passcode set")?;
        }

        Commands::Change { current, new } => {
            let outcome = manager
                .submit_passcode(&Passcode::try_from(current.as_str())?)
                .await?;
            if outcome != AttemptOutcome::Accepted {
                let status = manager.policy().status().await?;
                writeln!(out, "{}", describe_outcome(outcome, &status))?;
                bail!("current passcode not accepted");
            }
            if !vault.update_passcode(&Passcode::try_from(new.as_str())?).await? {
                bail!("No passcode is set; use `authgate set`");
            }
            writeln!(out, "✓ Passcode changed")?;
            writeln!(out, "Biometric unlock was disabled; enroll again to re-enable it")?;
        }

        Commands::Verify { passcode } => {
            let outcome = manager
                .submit_passcode(&Passcode::try_from(passcode.as_str())?)
                .await?;
            let status = manager.policy().status().await?;
            writeln!(out, "{}", describe_outcome(outcome, &status))?;
            if outcome != AttemptOutcome::Accepted {
                bail!("passcode not accepted");
            }
        }

        Commands::EnrollBiometric { passcode } => {
            if !vault
                .enroll_biometric(&Passcode::try_from(passcode.as_str())?)
                .await?
            {
                bail!("Biometric enrollment failed");
            }
            writeln!(out, "✓ Biometric unlock enabled")?;
        }

        Commands::UnlockBiometric => {
            if !manager.unlock_with_biometric().await? {
                bail!("Biometric unlock failed");
            }
            writeln!(out, "✓ Unlocked")?;
        }

        Commands::DisableBiometric => {
            vault.delete_biometric().await?;
            writeln!(out, "✓ Biometric unlock disabled")?;
        }

        Commands::Token(TokenCommands::Set { token }) => {
            vault.store_session_token(&token).await?;
            writeln!(out, "✓ Session token stored")?;
        }

        Commands::Token(TokenCommands::Get) => match vault.session_token().await? {
            Some(token) => writeln!(out, "{}", token)?,
            None => bail!("No session token stored"),
        },

        Commands::Token(TokenCommands::Delete) => {
            if vault.delete_session_token().await? {
                writeln!(out, "✓ Session token deleted")?;
            } else {
                writeln!(out, "No session token stored")?;
            }
        }

        Commands::Wipe { yes } => {
            if !yes {
                bail!("Refusing to wipe without --yes");
            }
            vault.wipe_all().await?;
            info!("Credentials wiped from the shell");
            writeln!(out, "✓ All credentials wiped")?;
        }
    }

    Ok(())
}

/// User-facing line for a passcode attempt
pub fn describe_outcome(outcome: AttemptOutcome, status: &LockoutStatus) -> String {
    match outcome {
        AttemptOutcome::Accepted => "✓ Passcode accepted".to_string(),
        AttemptOutcome::Suspended { remaining_minutes } => {
            format!("Too many attempts. Try again in {} min", remaining_minutes)
        }
        AttemptOutcome::Rejected(FailedPinState::Deleted) => {
            "Wrong passcode. All credentials have been erased".to_string()
        }
        // Counter or fresh marker already reflect the failure
        AttemptOutcome::Rejected(_) => format!("Wrong passcode. {}", status.describe()),
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
