//! Types shared between the hardware layer and the controller.

use std::fmt;

use latchkey_core::constants::MAX_SERVO_ANGLE;
use serde::{Deserialize, Serialize};

use crate::error::{HardwareError, Result};

/// Target angle of the lock servo, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServoPosition(u16);

impl ServoPosition {
    /// Create a servo position with validation.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InvalidData` if the angle exceeds the servo
    /// range.
    pub fn new(angle: u16) -> Result<Self> {
        if angle > MAX_SERVO_ANGLE {
            return Err(HardwareError::invalid_data(format!(
                "Servo angle must be 0-{MAX_SERVO_ANGLE}, got {angle}"
            )));
        }
        Ok(Self(angle))
    }

    #[must_use]
    pub fn angle(self) -> u16 {
        self.0
    }
}

impl fmt::Display for ServoPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// A command issued to an actuator, as recorded by test doubles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCommand {
    /// Drive to and hold the position.
    MoveTo(ServoPosition),

    /// Drop holding torque.
    Release,
}

/// Debounced input from the door sensor or manual switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorEvent {
    /// Door sensor reports the door opened.
    DoorOpened,

    /// Door sensor reports the door closed.
    DoorClosed,

    /// Manual unlock button pressed.
    ManualUnlock,

    /// Manual lock button pressed.
    ManualLock,
}

impl fmt::Display for DoorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DoorEvent::DoorOpened => "DoorOpened",
            DoorEvent::DoorClosed => "DoorClosed",
            DoorEvent::ManualUnlock => "ManualUnlock",
            DoorEvent::ManualLock => "ManualLock",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for DoorEvent {
    type Err = HardwareError;

    /// Parse the bench-test command names (`open`, `close`, `unlock`, `lock`).
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" | "opened" => Ok(DoorEvent::DoorOpened),
            "close" | "closed" => Ok(DoorEvent::DoorClosed),
            "unlock" => Ok(DoorEvent::ManualUnlock),
            "lock" => Ok(DoorEvent::ManualLock),
            other => Err(HardwareError::invalid_data(format!(
                "Unknown door event: {other:?}"
            ))),
        }
    }
}
