//! Property-based tests for the lock transition controller.
//!
//! Random interleavings of requests, door events and ticks must never leave
//! the controller with an engaged drive and no transition, and every
//! transition must settle within the longest possible command duration.

use latchkey_hardware::mock::RecordingActuator;
use latchkey_hardware::ServoPosition;
use latchkey_lock::{LockState, LockTiming, LockTransitionController};
use proptest::prelude::*;

const FULL: u32 = 50;
const DRIFT: u32 = 5;
const WINDOW: u32 = 150;

#[derive(Debug, Clone, Copy)]
enum Op {
    Unlock,
    Lock,
    ForceUnlock,
    ForceLock,
    Revert,
    Ticks(u32),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Unlock),
        Just(Op::Lock),
        Just(Op::ForceUnlock),
        Just(Op::ForceLock),
        Just(Op::Revert),
        (1u32..80).prop_map(Op::Ticks),
    ]
}

fn controller() -> (
    LockTransitionController<RecordingActuator>,
    latchkey_hardware::mock::RecordingActuatorHandle,
) {
    let (actuator, handle) = RecordingActuator::new();
    let timing = LockTiming {
        transition_ticks: FULL,
        drift_compensation_ticks: DRIFT,
        revert_window_ticks: WINDOW,
    };
    let lock = LockTransitionController::new(
        actuator,
        timing,
        ServoPosition::new(0).unwrap(),
        ServoPosition::new(180).unwrap(),
    );
    (lock, handle)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_drive_engaged_only_while_transitioning(ops in prop::collection::vec(op(), 1..40)) {
        let (mut lock, handle) = controller();

        for op in ops {
            match op {
                Op::Unlock => { lock.request_unlock(); }
                Op::Lock => { lock.request_lock(); }
                Op::ForceUnlock => lock.force_unlock(),
                Op::ForceLock => lock.force_lock(),
                Op::Revert => { lock.revert_if_within_window(); }
                Op::Ticks(n) => {
                    for _ in 0..n {
                        lock.on_tick();
                    }
                }
            }

            prop_assert_eq!(handle.is_engaged(), lock.is_actuator_engaged());
            prop_assert!(lock.remaining_ticks() <= FULL + DRIFT);
            prop_assert!(lock.revert_window_remaining() <= WINDOW);
            prop_assert!(lock.revert_window_remaining() == 0 || lock.is_locked());
            if let LockState::Transitioning { remaining_ticks, .. } = lock.state() {
                prop_assert!(remaining_ticks > 0);
            }
        }
    }

    #[test]
    fn prop_every_transition_settles(ops in prop::collection::vec(op(), 1..40)) {
        let (mut lock, _handle) = controller();

        for op in ops {
            match op {
                Op::Unlock => { lock.request_unlock(); }
                Op::Lock => { lock.request_lock(); }
                Op::ForceUnlock => lock.force_unlock(),
                Op::ForceLock => lock.force_lock(),
                Op::Revert => { lock.revert_if_within_window(); }
                Op::Ticks(n) => {
                    for _ in 0..n {
                        lock.on_tick();
                    }
                }
            }
        }

        let target = lock.state().target();
        for _ in 0..(FULL + DRIFT) {
            lock.on_tick();
        }
        prop_assert_eq!(lock.state(), LockState::settled(target));
        prop_assert!(!lock.is_actuator_engaged());
    }
}
