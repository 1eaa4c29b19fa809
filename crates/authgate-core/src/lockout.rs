//! Brute-force protection through attempt counting and suspension
//!
//! Failed passcode attempts advance a counter persisted in the secret store.
//! With the default configuration:
//!
//! - 1-4 failures: caller may retry
//! - 5th failure: suspended for 10 minutes, counter reset
//! - 5th failure again while the marker of an earlier suspension is still
//!   stored: counter and marker purged, caller must wipe the credential
//!
//! The counter and marker are only mutated while holding the policy's
//! mutex, so concurrent attempts can neither double count nor lose a
//! suspension marker.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{AuthError, Result};
use crate::record;
use crate::store::{self, AccessPolicy, SecretKey, SecretStore};

/// Failed attempts allowed before a suspension starts
pub const ALLOWED_PIN_COUNT: u32 = 5;
/// Length of a suspension window
pub const SUSPENSION_SECONDS: u64 = 10 * 60;

/// Lockout thresholds
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutConfig {
    /// Failures that trigger a suspension
    #[serde(default = "default_allowed_attempts")]
    pub allowed_attempts: u32,
    /// Suspension window in seconds
    #[serde(default = "default_suspension_secs")]
    pub suspension_secs: u64,
}

fn default_allowed_attempts() -> u32 {
    ALLOWED_PIN_COUNT
}

fn default_suspension_secs() -> u64 {
    SUSPENSION_SECONDS
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            allowed_attempts: ALLOWED_PIN_COUNT,
            suspension_secs: SUSPENSION_SECONDS,
        }
    }
}

impl LockoutConfig {
    /// Suspension window as a [`Duration`]
    pub fn suspension(&self) -> Duration {
        Duration::from_secs(self.suspension_secs)
    }

    /// Reject configurations the state machine cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.allowed_attempts == 0 {
            return Err(AuthError::InvalidInput(
                "allowed_attempts must be at least 1".to_string(),
            ));
        }
        if i64::try_from(self.suspension_secs).is_err() {
            return Err(AuthError::InvalidInput(
                "suspension_secs out of range".to_string(),
            ));
        }
        Ok(())
    }
}

/// Decision returned after a failed attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedPinState {
    /// Below the threshold, no earlier suspension on record
    CanContinue,
    /// Below the threshold, but an earlier suspension is still on record
    WillSuspend,
    /// Threshold reached, suspension window started
    JustSuspended,
    /// Threshold reached again with a suspension on record; wipe everything
    Deleted,
}

/// Point-in-time view of the lockout records
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockoutStatus {
    pub failed_attempts: u32,
    pub allowed_attempts: u32,
    pub suspended_since: Option<i64>,
    /// Whole minutes left in the window, non-positive once it elapsed
    pub remaining_minutes: i64,
}

impl LockoutStatus {
    /// Whether the caller must refuse passcode entry
    pub fn is_suspended(&self) -> bool {
        self.suspended_since.is_some() && self.remaining_minutes > 0
    }

    pub fn attempts_remaining(&self) -> u32 {
        self.allowed_attempts.saturating_sub(self.failed_attempts)
    }

    /// Human-readable description of the current state
    pub fn describe(&self) -> String {
        if self.is_suspended() {
            if self.remaining_minutes == 1 {
                "Locked for 1 minute".to_string()
            } else {
                format!("Locked for {} minutes", self.remaining_minutes)
            }
        } else {
            format!("{} attempts remaining", self.attempts_remaining())
        }
    }
}

/// Owner of the attempt counter and suspension marker
pub struct LockoutPolicy {
    store: Arc<dyn SecretStore>,
    clock: Arc<dyn Clock>,
    config: LockoutConfig,
    guard: Mutex<()>,
}

impl LockoutPolicy {
    /// Create a policy using the system clock
    pub fn new(store: Arc<dyn SecretStore>, config: LockoutConfig) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    /// Create a policy with an explicit clock
    pub fn with_clock(
        store: Arc<dyn SecretStore>,
        clock: Arc<dyn Clock>,
        config: LockoutConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
            guard: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &LockoutConfig {
        &self.config
    }

    /// Advance the state machine after a failed attempt
    pub async fn record_failure(&self) -> Result<FailedPinState> {
        let _guard = self.guard.lock().await;

        let attempts = self.read_counter().await?.saturating_add(1);

        if attempts < self.config.allowed_attempts {
            store::put(
                self.store.as_ref(),
                SecretKey::FailCounter,
                &record::encode_count(attempts),
                AccessPolicy::WhenUnlocked,
            )
            .await?;

            let state = match self.read_marker().await? {
                None => FailedPinState::CanContinue,
                Some(_) => FailedPinState::WillSuspend,
            };
            debug!(
                "Failed attempt {}/{}: {:?}",
                attempts, self.config.allowed_attempts, state
            );
            return Ok(state);
        }

        match self.read_marker().await? {
            None => {
                let now = self.clock.now();
                store::put(
                    self.store.as_ref(),
                    SecretKey::SuspensionMarker,
                    &record::encode_timestamp(now),
                    AccessPolicy::WhenUnlocked,
                )
                .await?;
                self.store.delete(SecretKey::FailCounter).await?;
                warn!(
                    "Passcode entry suspended for {} seconds after {} failed attempts",
                    self.config.suspension_secs, attempts
                );
                Ok(FailedPinState::JustSuspended)
            }
            Some(since) => {
                self.store.delete(SecretKey::FailCounter).await?;
                self.store.delete(SecretKey::SuspensionMarker).await?;
                warn!(
                    "Attempt threshold reached again after suspension started at {}; credential must be wiped",
                    since
                );
                Ok(FailedPinState::Deleted)
            }
        }
    }

    /// Clear counter and marker after a successful authentication
    pub async fn record_success(&self) -> Result<()> {
        let _guard = self.guard.lock().await;

        let had_marker = self.store.delete(SecretKey::SuspensionMarker).await?;
        let had_counter = self.store.delete(SecretKey::FailCounter).await?;
        if had_marker || had_counter {
            debug!("Lockout records reset");
        }
        Ok(())
    }

    /// Whole minutes left in the suspension window
    ///
    /// Zero when not suspended. Goes negative once the window elapsed and
    /// the marker has not been cleared yet; see
    /// [`clear_expired_suspension`](Self::clear_expired_suspension).
    pub async fn remaining_suspension_minutes(&self) -> Result<i64> {
        Ok(match self.read_marker().await? {
            Some(since) => self.minutes_left(since),
            None => 0,
        })
    }

    /// Drop the suspension marker if its window has elapsed
    ///
    /// `record_failure` never does this itself; callers run it once they
    /// observe a non-positive remaining time. Returns whether a marker was
    /// removed.
    pub async fn clear_expired_suspension(&self) -> Result<bool> {
        let _guard = self.guard.lock().await;

        match self.read_marker().await? {
            Some(since) if self.minutes_left(since) <= 0 => {
                let removed = self.store.delete(SecretKey::SuspensionMarker).await?;
                if removed {
                    debug!("Expired suspension marker from {} cleared", since);
                }
                Ok(removed)
            }
            _ => Ok(false),
        }
    }

    /// Consecutive failures currently on record
    pub async fn failed_attempts(&self) -> Result<u32> {
        self.read_counter().await
    }

    /// Failures left before the next suspension
    pub async fn attempts_remaining(&self) -> Result<u32> {
        Ok(self
            .config
            .allowed_attempts
            .saturating_sub(self.read_counter().await?))
    }

    /// Start of the current (or unresolved) suspension
    pub async fn suspended_since(&self) -> Result<Option<i64>> {
        self.read_marker().await
    }

    /// Snapshot of counter, marker and remaining time
    pub async fn status(&self) -> Result<LockoutStatus> {
        let failed_attempts = self.read_counter().await?;
        let suspended_since = self.read_marker().await?;
        let remaining_minutes = suspended_since.map_or(0, |since| self.minutes_left(since));
        Ok(LockoutStatus {
            failed_attempts,
            allowed_attempts: self.config.allowed_attempts,
            suspended_since,
            remaining_minutes,
        })
    }

    fn minutes_left(&self, since: i64) -> i64 {
        let window = i64::try_from(self.config.suspension_secs).unwrap_or(i64::MAX);
        since
            .saturating_add(window)
            .saturating_sub(self.clock.now())
            .div_euclid(60)
    }

    /// Counter value, zero if absent or corrupted
    async fn read_counter(&self) -> Result<u32> {
        let Some(bytes) = self.store.read(SecretKey::FailCounter, None).await? else {
            return Ok(0);
        };
        match record::decode_count(&bytes) {
            Ok(count) => Ok(count),
            Err(e) => {
                warn!("Ignoring unreadable attempt counter: {}", e);
                Ok(0)
            }
        }
    }

    /// Marker value, `None` if absent or corrupted
    async fn read_marker(&self) -> Result<Option<i64>> {
        let Some(bytes) = self.store.read(SecretKey::SuspensionMarker, None).await? else {
            return Ok(None);
        };
        match record::decode_timestamp(&bytes) {
            Ok(since) => Ok(Some(since)),
            Err(e) => {
                warn!("Ignoring unreadable suspension marker: {}", e);
                Ok(None)
            }
        }
    }
}
