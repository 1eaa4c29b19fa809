#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use authgate_core::{
    memory::MemorySecretStore, Clock, FailedPinState, LockoutConfig, LockoutPolicy, ManualClock,
};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Op {
    Fail,
    Succeed,
    Wait(u16),
    ClearExpired,
}

#[derive(Arbitrary, Debug)]
struct Input {
    allowed_attempts: u8,
    suspension_secs: u16,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    let config = LockoutConfig {
        allowed_attempts: u32::from(input.allowed_attempts.max(1)),
        suspension_secs: u64::from(input.suspension_secs),
    };
    let allowed = config.allowed_attempts;

    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    rt.block_on(async {
        let store = Arc::new(MemorySecretStore::new());
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let policy = LockoutPolicy::with_clock(store.clone(), clock.clone(), config);

        for op in input.ops.iter().take(256) {
            match op {
                Op::Fail => {
                    let state = policy.record_failure().await.unwrap();
                    let marker = policy.suspended_since().await.unwrap();
                    match state {
                        FailedPinState::JustSuspended => assert_eq!(marker, Some(clock.now())),
                        FailedPinState::Deleted => assert!(store.is_empty()),
                        FailedPinState::WillSuspend => assert!(marker.is_some()),
                        FailedPinState::CanContinue => assert!(marker.is_none()),
                    }
                }
                Op::Succeed => {
                    policy.record_success().await.unwrap();
                    assert!(store.is_empty());
                }
                Op::Wait(secs) => clock.advance(i64::from(*secs)),
                Op::ClearExpired => {
                    policy.clear_expired_suspension().await.unwrap();
                }
            }

            // Counter never rests at the threshold
            assert!(policy.failed_attempts().await.unwrap() < allowed);
        }
    });
});
