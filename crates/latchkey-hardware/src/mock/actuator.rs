//! Recording actuator for tests and bench setups.
//!
//! The actuator half is handed to the lock controller; the handle half stays
//! with the test and observes every command issued.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{HardwareError, Result};
use crate::traits::Actuator;
use crate::types::{ActuatorCommand, ServoPosition};

#[derive(Debug, Default)]
struct Recorder {
    commands: Vec<ActuatorCommand>,
    engaged_at: Option<ServoPosition>,
    fail_next: bool,
}

/// Actuator that records commands instead of driving hardware.
///
/// # Examples
///
/// ```
/// use latchkey_hardware::mock::RecordingActuator;
/// use latchkey_hardware::traits::Actuator;
/// use latchkey_hardware::types::{ActuatorCommand, ServoPosition};
///
/// let (mut actuator, handle) = RecordingActuator::new();
/// let unlocked = ServoPosition::new(180).unwrap();
///
/// actuator.move_to(unlocked).unwrap();
/// assert_eq!(handle.commands(), vec![ActuatorCommand::MoveTo(unlocked)]);
/// ```
#[derive(Debug)]
pub struct RecordingActuator {
    recorder: Arc<Mutex<Recorder>>,
}

impl RecordingActuator {
    /// Create a recording actuator and its observer handle.
    pub fn new() -> (Self, RecordingActuatorHandle) {
        let recorder = Arc::new(Mutex::new(Recorder::default()));
        (
            Self {
                recorder: Arc::clone(&recorder),
            },
            RecordingActuatorHandle { recorder },
        )
    }

    fn record(&self, command: ActuatorCommand) -> Result<()> {
        let mut recorder = lock(&self.recorder);
        if recorder.fail_next {
            recorder.fail_next = false;
            return Err(HardwareError::actuator("injected failure"));
        }

        recorder.engaged_at = match command {
            ActuatorCommand::MoveTo(position) => Some(position),
            ActuatorCommand::Release => None,
        };
        recorder.commands.push(command);
        Ok(())
    }
}

impl Actuator for RecordingActuator {
    fn move_to(&mut self, position: ServoPosition) -> Result<()> {
        self.record(ActuatorCommand::MoveTo(position))
    }

    fn release(&mut self) -> Result<()> {
        self.record(ActuatorCommand::Release)
    }
}

/// Observer for a [`RecordingActuator`].
#[derive(Debug, Clone)]
pub struct RecordingActuatorHandle {
    recorder: Arc<Mutex<Recorder>>,
}

impl RecordingActuatorHandle {
    /// Every successful command, oldest first.
    pub fn commands(&self) -> Vec<ActuatorCommand> {
        lock(&self.recorder).commands.clone()
    }

    /// Number of successful commands so far.
    pub fn command_count(&self) -> usize {
        lock(&self.recorder).commands.len()
    }

    /// Most recent successful command.
    pub fn last_command(&self) -> Option<ActuatorCommand> {
        lock(&self.recorder).commands.last().copied()
    }

    /// Returns `true` if the drive is currently holding a position.
    pub fn is_engaged(&self) -> bool {
        lock(&self.recorder).engaged_at.is_some()
    }

    /// Position currently held, if engaged.
    pub fn engaged_at(&self) -> Option<ServoPosition> {
        lock(&self.recorder).engaged_at
    }

    /// Make the next command fail with an actuator error.
    pub fn fail_next(&self) {
        lock(&self.recorder).fail_next = true;
    }

    /// Forget recorded commands, keeping the engaged state.
    pub fn clear(&self) {
        lock(&self.recorder).commands.clear();
    }
}

// A panic while holding the lock can only come from a test assertion; keep
// recording rather than cascading the poison.
fn lock(recorder: &Mutex<Recorder>) -> MutexGuard<'_, Recorder> {
    recorder
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(angle: u16) -> ServoPosition {
        ServoPosition::new(angle).unwrap()
    }

    #[test]
    fn test_records_commands_in_order() {
        let (mut actuator, handle) = RecordingActuator::new();

        actuator.move_to(position(180)).unwrap();
        actuator.release().unwrap();
        actuator.move_to(position(0)).unwrap();

        assert_eq!(
            handle.commands(),
            vec![
                ActuatorCommand::MoveTo(position(180)),
                ActuatorCommand::Release,
                ActuatorCommand::MoveTo(position(0)),
            ]
        );
        assert_eq!(handle.engaged_at(), Some(position(0)));
    }

    #[test]
    fn test_injected_failure_is_not_recorded() {
        let (mut actuator, handle) = RecordingActuator::new();
        handle.fail_next();

        assert!(actuator.move_to(position(180)).is_err());
        assert_eq!(handle.command_count(), 0);
        assert!(!handle.is_engaged());

        actuator.move_to(position(180)).unwrap();
        assert!(handle.is_engaged());
    }

    #[test]
    fn test_clear_keeps_engaged_state() {
        let (mut actuator, handle) = RecordingActuator::new();
        actuator.move_to(position(90)).unwrap();

        handle.clear();
        assert_eq!(handle.command_count(), 0);
        assert!(handle.is_engaged());
        assert_eq!(handle.last_command(), None);
    }
}
