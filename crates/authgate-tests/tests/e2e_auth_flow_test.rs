//! End-to-end authentication flow tests for authgate
//!
//! These tests drive the manager the way an app shell would: first-run
//! passcode setup, biometric enrollment, wrong-passcode lockout and
//! recovery, credential rotation and wipe.

use std::sync::Arc;

use authgate_cli::{FilePreferenceStore, FileSecretStore};
use authgate_core::{
    memory::{MemoryPreferenceStore, MemorySecretStore, ScriptedBiometricGate},
    AttemptOutcome, AuthManager, FailedPinState, LockoutConfig, ManualClock, Passcode, SecretKey,
    ALLOWED_PIN_COUNT,
};
use tempfile::TempDir;

const START: i64 = 1_700_000_000;

struct Harness {
    manager: AuthManager,
    store: Arc<MemorySecretStore>,
    gate: Arc<ScriptedBiometricGate>,
    clock: Arc<ManualClock>,
}

fn harness() -> Harness {
    let store = Arc::new(MemorySecretStore::new());
    let gate = Arc::new(ScriptedBiometricGate::new(store.clone()));
    let clock = Arc::new(ManualClock::new(START));
    let manager = AuthManager::with_clock(
        store.clone(),
        gate.clone(),
        Arc::new(MemoryPreferenceStore::new()),
        clock.clone(),
        LockoutConfig::default(),
    );
    Harness {
        manager,
        store,
        gate,
        clock,
    }
}

fn pin(value: &str) -> Passcode {
    Passcode::try_from(value).unwrap()
}

/// Wrong passcodes until the suspension starts, then wait it out
#[tokio::test]
async fn test_wrong_passcode_lockout_and_recovery() {
    let h = harness();

    // ==========================================
    // STEP 1: First run, passcode setup
    // ==========================================
    assert!(!h.manager.vault().is_passcode_set());
    assert!(h.manager.vault().set_passcode(&pin("1234")).await.unwrap());
    assert!(h.manager.vault().is_passcode_set());
    assert!(h.manager.vault().validate(&pin("1234")).await.unwrap());

    // ==========================================
    // STEP 2: Four wrong attempts
    // ==========================================
    for attempt in 1..ALLOWED_PIN_COUNT {
        assert_eq!(
            h.manager.submit_passcode(&pin("0000")).await.unwrap(),
            AttemptOutcome::Rejected(FailedPinState::CanContinue)
        );
        let status = h.manager.suspension_status().await.unwrap();
        assert_eq!(status.failed_attempts, attempt);
        assert_eq!(status.attempts_remaining(), ALLOWED_PIN_COUNT - attempt);
    }

    // ==========================================
    // STEP 3: Fifth wrong attempt suspends entry
    // ==========================================
    assert_eq!(
        h.manager.submit_passcode(&pin("0000")).await.unwrap(),
        AttemptOutcome::Rejected(FailedPinState::JustSuspended)
    );
    assert_eq!(
        h.manager
            .policy()
            .remaining_suspension_minutes()
            .await
            .unwrap(),
        10
    );

    // ==========================================
    // STEP 4: Entry refused while suspended
    // ==========================================
    h.clock.advance(5 * 60);
    assert_eq!(
        h.manager.submit_passcode(&pin("1234")).await.unwrap(),
        AttemptOutcome::Suspended {
            remaining_minutes: 5
        }
    );
    assert_eq!(
        h.manager.suspension_status().await.unwrap().describe(),
        "Locked for 5 minutes"
    );

    // ==========================================
    // STEP 5: Window elapses, correct passcode accepted
    // ==========================================
    h.clock.advance(5 * 60);
    assert!(!h.manager.suspension_status().await.unwrap().is_suspended());
    assert_eq!(
        h.manager.submit_passcode(&pin("1234")).await.unwrap(),
        AttemptOutcome::Accepted
    );
    assert!(!h.store.contains(SecretKey::FailCounter));
    assert!(!h.store.contains(SecretKey::SuspensionMarker));
}

/// A second run of failures after an unresolved suspension reports
/// `Deleted`, and the credential wipe leaves nothing behind
#[tokio::test]
async fn test_repeat_offence_wipes_credentials() {
    let h = harness();
    let vault = h.manager.vault();
    let policy = h.manager.policy();

    vault.set_passcode(&pin("1234")).await.unwrap();
    vault.enroll_biometric(&pin("1234")).await.unwrap();
    vault.store_session_token("session").await.unwrap();

    for _ in 0..ALLOWED_PIN_COUNT {
        policy.record_failure().await.unwrap();
    }
    h.clock.advance(60 * 60);

    for _ in 1..ALLOWED_PIN_COUNT {
        assert_eq!(
            policy.record_failure().await.unwrap(),
            FailedPinState::WillSuspend
        );
    }
    assert_eq!(
        policy.record_failure().await.unwrap(),
        FailedPinState::Deleted
    );

    vault.wipe_all().await.unwrap();
    assert!(!vault.is_passcode_set());
    assert!(!vault.is_biometric_switch_on());
    assert!(h.store.is_empty());
    assert_eq!(vault.session_token().await.unwrap(), None);
    assert!(!vault.validate(&pin("1234")).await.unwrap());
}

/// Rotating the passcode drops the biometric copy until re-enrollment
#[tokio::test]
async fn test_passcode_rotation_invalidates_biometric() {
    let h = harness();
    let vault = h.manager.vault();

    vault.set_passcode(&pin("1234")).await.unwrap();
    assert!(vault.enroll_biometric(&pin("1234")).await.unwrap());
    assert!(vault.is_biometric_switch_on());
    assert!(h.manager.unlock_with_biometric().await.unwrap());

    assert!(vault.update_passcode(&pin("5678")).await.unwrap());
    assert!(!vault.is_biometric_switch_on());
    assert!(!h.manager.unlock_with_biometric().await.unwrap());
    assert!(vault.validate(&pin("5678")).await.unwrap());
    assert!(!vault.validate(&pin("1234")).await.unwrap());

    // The old passcode cannot be used to re-enroll
    assert!(!vault.enroll_biometric(&pin("1234")).await.unwrap());
    assert!(vault.enroll_biometric(&pin("5678")).await.unwrap());
    assert!(h.manager.unlock_with_biometric().await.unwrap());
}

/// Biometric unlock stays usable during a suspension and clears it
#[tokio::test]
async fn test_biometric_unlock_lifts_suspension() {
    let h = harness();
    let vault = h.manager.vault();
    vault.set_passcode(&pin("1234")).await.unwrap();
    vault.enroll_biometric(&pin("1234")).await.unwrap();

    for _ in 0..ALLOWED_PIN_COUNT {
        h.manager.submit_passcode(&pin("0000")).await.unwrap();
    }
    assert!(h.manager.suspension_status().await.unwrap().is_suspended());

    let challenges = h.gate.challenges();
    assert!(h.manager.unlock_with_biometric().await.unwrap());
    assert_eq!(h.gate.challenges(), challenges + 1);

    let status = h.manager.suspension_status().await.unwrap();
    assert!(!status.is_suspended());
    assert_eq!(status.failed_attempts, 0);
    assert_eq!(
        h.manager.submit_passcode(&pin("1234")).await.unwrap(),
        AttemptOutcome::Accepted
    );
}

/// Credential and lockout state persist across process restarts
#[tokio::test]
async fn test_file_backed_state_survives_restart() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("secrets.json");
    let prefs_path = dir.path().join("preferences.json");
    let clock = Arc::new(ManualClock::new(START));

    let open = |clock: Arc<ManualClock>| {
        let store = Arc::new(FileSecretStore::open(&store_path).unwrap());
        AuthManager::with_clock(
            store.clone(),
            Arc::new(ScriptedBiometricGate::new(store)),
            Arc::new(FilePreferenceStore::open(&prefs_path).unwrap()),
            clock,
            LockoutConfig::default(),
        )
    };

    // ==========================================
    // STEP 1: Set a passcode and trigger a suspension
    // ==========================================
    {
        let manager = open(clock.clone());
        manager.vault().set_passcode(&pin("1234")).await.unwrap();
        manager.vault().enroll_biometric(&pin("1234")).await.unwrap();
        for _ in 0..ALLOWED_PIN_COUNT {
            manager.submit_passcode(&pin("0000")).await.unwrap();
        }
    }

    // ==========================================
    // STEP 2: Restart and observe the same state
    // ==========================================
    clock.advance(3 * 60);
    let manager = open(clock.clone());
    assert!(manager.vault().is_passcode_set());
    assert!(manager.vault().is_biometric_switch_on());

    let status = manager.suspension_status().await.unwrap();
    assert_eq!(status.suspended_since, Some(START));
    assert_eq!(status.remaining_minutes, 7);
    assert_eq!(
        manager.submit_passcode(&pin("1234")).await.unwrap(),
        AttemptOutcome::Suspended {
            remaining_minutes: 7
        }
    );

    // ==========================================
    // STEP 3: Wipe and restart clean
    // ==========================================
    manager.vault().wipe_all().await.unwrap();
    drop(manager);

    let manager = open(clock);
    assert!(!manager.vault().is_passcode_set());
    assert!(!manager.vault().is_biometric_switch_on());
    assert_eq!(manager.suspension_status().await.unwrap().suspended_since, None);
}

/// Custom thresholds flow through the whole gate
#[tokio::test]
async fn test_custom_lockout_config() {
    let store = Arc::new(MemorySecretStore::new());
    let clock = Arc::new(ManualClock::new(START));
    let manager = AuthManager::with_clock(
        store.clone(),
        Arc::new(ScriptedBiometricGate::new(store)),
        Arc::new(MemoryPreferenceStore::new()),
        clock.clone(),
        LockoutConfig {
            allowed_attempts: 2,
            suspension_secs: 120,
        },
    );
    manager.vault().set_passcode(&pin("1234")).await.unwrap();

    assert_eq!(
        manager.submit_passcode(&pin("0000")).await.unwrap(),
        AttemptOutcome::Rejected(FailedPinState::CanContinue)
    );
    assert_eq!(
        manager.submit_passcode(&pin("0000")).await.unwrap(),
        AttemptOutcome::Rejected(FailedPinState::JustSuspended)
    );
    assert_eq!(
        manager.submit_passcode(&pin("1234")).await.unwrap(),
        AttemptOutcome::Suspended {
            remaining_minutes: 2
        }
    );

    clock.advance(120);
    assert_eq!(
        manager.submit_passcode(&pin("1234")).await.unwrap(),
        AttemptOutcome::Accepted
    );
}
