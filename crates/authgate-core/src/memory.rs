//! In-memory implementations of the platform contracts
//!
//! NOT secure for production use: nothing is encrypted and nothing survives
//! the process. Used by the unit and integration tests and by embedders that
//! want a throwaway gate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::biometric::{BiometricGate, BiometryKind, BiometryState};
use crate::error::{AuthError, BiometricError, Result};
use crate::prefs::PreferenceStore;
use crate::store::{AccessPolicy, AuthContext, SecretBytes, SecretKey, SecretStore};

fn poisoned<T>(_: T) -> AuthError {
    AuthError::StoreUnavailable("lock poisoned".to_string())
}

struct Entry {
    value: Zeroizing<Vec<u8>>,
    policy: AccessPolicy,
}

/// Secret store backed by a `HashMap`
#[derive(Default)]
pub struct MemorySecretStore {
    entries: RwLock<HashMap<SecretKey, Entry>>,
    unavailable: AtomicBool,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreUnavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Whether an entry exists, ignoring access policy
    pub fn contains(&self, key: SecretKey) -> bool {
        self.entries
            .read()
            .map(|entries| entries.contains_key(&key))
            .unwrap_or(false)
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuthError::StoreUnavailable(
                "memory store switched off".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn create(&self, key: SecretKey, value: &[u8], policy: AccessPolicy) -> Result<bool> {
        tokio::task::yield_now().await;
        self.check_available()?;

        let mut entries = self.entries.write().map_err(poisoned)?;
        if entries.contains_key(&key) {
            return Ok(false);
        }
        entries.insert(
            key,
            Entry {
                value: Zeroizing::new(value.to_vec()),
                policy,
            },
        );
        Ok(true)
    }

    async fn read(&self, key: SecretKey, auth: Option<&AuthContext>) -> Result<Option<SecretBytes>> {
        tokio::task::yield_now().await;
        self.check_available()?;

        let entries = self.entries.read().map_err(poisoned)?;
        let Some(entry) = entries.get(&key) else {
            return Ok(None);
        };
        if entry.policy == AccessPolicy::BiometryCurrentSet && auth.is_none() {
            return Err(AuthError::AccessDenied(format!(
                "{} requires biometric authentication",
                key
            )));
        }
        Ok(Some(entry.value.clone()))
    }

    async fn update(&self, key: SecretKey, value: &[u8]) -> Result<bool> {
        tokio::task::yield_now().await;
        self.check_available()?;

        let mut entries = self.entries.write().map_err(poisoned)?;
        match entries.get_mut(&key) {
            Some(entry) => {
                entry.value = Zeroizing::new(value.to_vec());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, key: SecretKey) -> Result<bool> {
        tokio::task::yield_now().await;
        self.check_available()?;

        let mut entries = self.entries.write().map_err(poisoned)?;
        Ok(entries.remove(&key).is_some())
    }
}

/// Preference store backed by a `HashMap`
#[derive(Default)]
pub struct MemoryPreferenceStore {
    flags: RwLock<HashMap<String, bool>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<bool>> {
        let flags = self.flags.read().map_err(poisoned)?;
        Ok(flags.get(key).copied())
    }

    fn set(&self, key: &str, value: bool) -> Result<()> {
        let mut flags = self.flags.write().map_err(poisoned)?;
        flags.insert(key.to_string(), value);
        Ok(())
    }
}

/// Biometric gate whose outcome is scripted by the test
///
/// Challenges succeed while the state is [`BiometryState::Available`] unless
/// a failure was queued with [`fail_next`](Self::fail_next). Scoped
/// challenges read through the wrapped store with a biometric
/// [`AuthContext`].
pub struct ScriptedBiometricGate {
    store: Arc<dyn SecretStore>,
    state: Mutex<BiometryState>,
    kind: BiometryKind,
    next_failure: Mutex<Option<BiometricError>>,
    challenges: AtomicUsize,
}

impl ScriptedBiometricGate {
    /// Gate with an available fingerprint sensor
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self::with_state(store, BiometryState::Available)
    }

    pub fn with_state(store: Arc<dyn SecretStore>, state: BiometryState) -> Self {
        Self {
            store,
            state: Mutex::new(state),
            kind: BiometryKind::Fingerprint,
            next_failure: Mutex::new(None),
            challenges: AtomicUsize::new(0),
        }
    }

    pub fn set_state(&self, state: BiometryState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
    }

    /// Fail the next challenge with `error`
    pub fn fail_next(&self, error: BiometricError) {
        if let Ok(mut next) = self.next_failure.lock() {
            *next = Some(error);
        }
    }

    /// Number of challenges presented so far
    pub fn challenges(&self) -> usize {
        self.challenges.load(Ordering::SeqCst)
    }

    fn evaluate(&self) -> std::result::Result<(), BiometricError> {
        self.challenges.fetch_add(1, Ordering::SeqCst);

        match self.state() {
            BiometryState::Available => {}
            BiometryState::Locked => return Err(BiometricError::LockedOut),
            BiometryState::Unavailable => return Err(BiometricError::Unavailable),
        }

        let queued = self
            .next_failure
            .lock()
            .map_err(|_| BiometricError::Hardware("lock poisoned".to_string()))?
            .take();
        match queued {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BiometricGate for ScriptedBiometricGate {
    fn state(&self) -> BiometryState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(BiometryState::Unavailable)
    }

    fn kind(&self) -> BiometryKind {
        self.kind
    }

    async fn challenge(&self, _reason: &str) -> std::result::Result<bool, BiometricError> {
        self.evaluate()?;
        Ok(true)
    }

    async fn challenge_for_store_access(
        &self,
        key: SecretKey,
        reason: &str,
    ) -> std::result::Result<Option<SecretBytes>, BiometricError> {
        self.evaluate()?;
        let context = AuthContext::biometric(reason);
        self.store
            .read(key, Some(&context))
            .await
            .map_err(|e| BiometricError::Hardware(e.to_string()))
    }
}
