//! Open-loop lock transition controller.
//!
//! The drive has no position feedback. The controller engages the actuator
//! toward an end position, counts ticks for the nominal travel time, then
//! releases it. Because the count is known at every tick, a transition that
//! is reversed midway only needs to run for the travel already covered.

use latchkey_core::LockConfig;
use latchkey_hardware::{Actuator, HardwareError, ServoPosition};
use tracing::{debug, info, trace, warn};

use crate::state::{LockState, LockTarget};

/// Tick counts driving the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockTiming {
    /// Nominal end-to-end travel time.
    pub transition_ticks: u32,

    /// Extra travel added when an in-flight unlock is reversed into a lock.
    pub drift_compensation_ticks: u32,

    /// How long after a lock command a door opening still reverts it.
    pub revert_window_ticks: u32,
}

impl LockTiming {
    /// Convert the configured durations to ticks.
    pub fn from_config(config: &LockConfig) -> Self {
        Self {
            transition_ticks: config.transition_ticks(),
            drift_compensation_ticks: config.drift_compensation_ticks(),
            revert_window_ticks: config.revert_window_ticks(),
        }
    }
}

/// Lock state machine that owns the actuator.
///
/// All operations are synchronous and never fail; actuator errors are logged
/// and the tick bookkeeping carries on as if the command succeeded.
///
/// # Examples
///
/// ```
/// use latchkey_hardware::mock::RecordingActuator;
/// use latchkey_hardware::ServoPosition;
/// use latchkey_lock::{LockState, LockTiming, LockTransitionController};
///
/// let (actuator, _handle) = RecordingActuator::new();
/// let timing = LockTiming {
///     transition_ticks: 3,
///     drift_compensation_ticks: 0,
///     revert_window_ticks: 10,
/// };
/// let mut lock = LockTransitionController::new(
///     actuator,
///     timing,
///     ServoPosition::new(0).unwrap(),
///     ServoPosition::new(180).unwrap(),
/// );
///
/// assert!(lock.request_unlock());
/// for _ in 0..3 {
///     lock.on_tick();
/// }
/// assert_eq!(lock.state(), LockState::Unlocked);
/// ```
#[derive(Debug)]
pub struct LockTransitionController<A> {
    actuator: A,
    timing: LockTiming,
    lock_position: ServoPosition,
    unlock_position: ServoPosition,
    state: LockState,
    /// Duration of the command currently in flight.
    command_ticks: u32,
    revert_window_remaining: u32,
}

impl<A: Actuator> LockTransitionController<A> {
    /// Create a controller. The lock is assumed to be locked at startup.
    pub fn new(
        actuator: A,
        timing: LockTiming,
        lock_position: ServoPosition,
        unlock_position: ServoPosition,
    ) -> Self {
        Self {
            actuator,
            timing,
            lock_position,
            unlock_position,
            state: LockState::Locked,
            command_ticks: 0,
            revert_window_remaining: 0,
        }
    }

    /// Create a controller from the `[lock]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InvalidData` if a configured angle is outside
    /// the servo range.
    pub fn from_config(actuator: A, config: &LockConfig) -> Result<Self, HardwareError> {
        Ok(Self::new(
            actuator,
            LockTiming::from_config(config),
            ServoPosition::new(config.lock_angle)?,
            ServoPosition::new(config.unlock_angle)?,
        ))
    }

    /// Start unlocking. Returns `false` if the lock is already unlocked or
    /// heading there.
    pub fn request_unlock(&mut self) -> bool {
        if self.state.target() == LockTarget::Unlocked {
            trace!(state = %self.state, "Unlock request ignored");
            return false;
        }

        let ticks = self.travel_covered();
        self.revert_window_remaining = 0;
        self.command(LockTarget::Unlocked, ticks);
        true
    }

    /// Start locking and open the revert window. Returns `false` if the lock
    /// is already locked or heading there.
    pub fn request_lock(&mut self) -> bool {
        if self.state.target() == LockTarget::Locked {
            trace!(state = %self.state, "Lock request ignored");
            return false;
        }

        let ticks = if self.state.is_transitioning() {
            self.travel_covered()
                .saturating_add(self.timing.drift_compensation_ticks)
        } else {
            self.timing.transition_ticks
        };
        self.command(LockTarget::Locked, ticks);
        self.revert_window_remaining = self.timing.revert_window_ticks;
        true
    }

    /// Drive to the locked position for the full travel time, whatever the
    /// current state.
    pub fn force_lock(&mut self) {
        self.revert_window_remaining = 0;
        self.command(LockTarget::Locked, self.timing.transition_ticks);
    }

    /// Drive to the unlocked position for the full travel time, whatever the
    /// current state.
    pub fn force_unlock(&mut self) {
        self.revert_window_remaining = 0;
        self.command(LockTarget::Unlocked, self.timing.transition_ticks);
    }

    /// Undo a recent lock if the revert window is still open.
    ///
    /// Returns `true` if the lock was reversed.
    pub fn revert_if_within_window(&mut self) -> bool {
        if self.revert_window_remaining == 0 || self.state.target() != LockTarget::Locked {
            debug!("Door opened outside the revert window");
            return false;
        }

        let ticks = self.travel_covered();
        info!(
            window_remaining = self.revert_window_remaining,
            ticks, "Door opened during lock, reverting"
        );
        self.revert_window_remaining = 0;
        self.command(self.state.target().opposite(), ticks);
        true
    }

    /// Advance one tick.
    ///
    /// Returns the end position if a transition completed on this tick.
    pub fn on_tick(&mut self) -> Option<LockTarget> {
        self.revert_window_remaining = self.revert_window_remaining.saturating_sub(1);

        let LockState::Transitioning {
            target,
            remaining_ticks,
        } = self.state
        else {
            return None;
        };

        let remaining_ticks = remaining_ticks.saturating_sub(1);
        if remaining_ticks > 0 {
            self.state = LockState::Transitioning {
                target,
                remaining_ticks,
            };
            return None;
        }

        self.settle(target);
        Some(target)
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    /// Ticks left in the current transition, zero when settled.
    pub fn remaining_ticks(&self) -> u32 {
        self.state.remaining_ticks()
    }

    /// Ticks since the current transition was commanded, zero when settled.
    pub fn elapsed_ticks(&self) -> u32 {
        if self.state.is_transitioning() {
            self.command_ticks.saturating_sub(self.remaining_ticks())
        } else {
            0
        }
    }

    pub fn revert_window_remaining(&self) -> u32 {
        self.revert_window_remaining
    }

    /// Whether the drive is holding torque. It is engaged exactly while a
    /// transition is in flight.
    pub fn is_actuator_engaged(&self) -> bool {
        self.state.is_transitioning()
    }

    /// Locked, or on the way there.
    pub fn is_locked(&self) -> bool {
        self.state.target() == LockTarget::Locked
    }

    pub fn timing(&self) -> LockTiming {
        self.timing
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Travel needed to return to the end opposite the current target:
    /// the full duration when settled, `full - remaining` when in flight.
    fn travel_covered(&self) -> u32 {
        match self.state {
            LockState::Transitioning {
                remaining_ticks, ..
            } => self
                .timing
                .transition_ticks
                .saturating_sub(remaining_ticks),
            _ => self.timing.transition_ticks,
        }
    }

    fn command(&mut self, target: LockTarget, ticks: u32) {
        self.command_ticks = ticks;

        if ticks == 0 {
            debug!(%target, "Zero-length transition, settling immediately");
            self.settle(target);
            return;
        }

        let position = match target {
            LockTarget::Locked => self.lock_position,
            LockTarget::Unlocked => self.unlock_position,
        };
        info!(%target, %position, ticks, "Lock transition started");

        if let Err(e) = self.actuator.move_to(position) {
            warn!(%target, "Actuator failed to engage: {}", e);
        }
        self.state = LockState::Transitioning {
            target,
            remaining_ticks: ticks,
        };
    }

    fn settle(&mut self, target: LockTarget) {
        if let Err(e) = self.actuator.release() {
            warn!(%target, "Actuator failed to release: {}", e);
        }
        self.state = LockState::settled(target);
        info!(%target, "Lock settled");
    }
}
