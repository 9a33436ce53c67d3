//! Concrete actuators and the enum wrapper used to select one at runtime.
//!
//! # Enum Dispatch Pattern
//!
//! The controller is generic over its actuator. The binary picks the drive
//! from configuration, so [`AnyActuator`] provides concrete type dispatch
//! without boxing. New drives are added as variants.

use tracing::info;

use crate::error::Result;
use crate::mock::RecordingActuator;
use crate::traits::Actuator;
use crate::types::ServoPosition;

/// Actuator that only logs the commands it receives.
///
/// Used when the controller runs without a drive attached, e.g. when bench
/// testing the reader and authorization path on a workstation.
#[derive(Debug, Default)]
pub struct LoggingActuator {
    engaged_at: Option<ServoPosition>,
}

impl LoggingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position currently held, if engaged.
    pub fn engaged_at(&self) -> Option<ServoPosition> {
        self.engaged_at
    }
}

impl Actuator for LoggingActuator {
    fn move_to(&mut self, position: ServoPosition) -> Result<()> {
        info!(%position, "Actuator engaged");
        self.engaged_at = Some(position);
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if let Some(position) = self.engaged_at.take() {
            info!(%position, "Actuator released");
        }
        Ok(())
    }
}

/// Enum wrapper for actuator dispatch.
///
/// # Examples
///
/// ```
/// use latchkey_hardware::devices::{AnyActuator, LoggingActuator};
/// use latchkey_hardware::traits::Actuator;
/// use latchkey_hardware::types::ServoPosition;
///
/// let mut actuator = AnyActuator::Logging(LoggingActuator::new());
/// actuator.move_to(ServoPosition::new(0).unwrap()).unwrap();
/// actuator.release().unwrap();
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyActuator {
    /// Logs commands without driving hardware.
    Logging(LoggingActuator),

    /// Records commands for inspection.
    Recording(RecordingActuator),
}

impl Actuator for AnyActuator {
    fn move_to(&mut self, position: ServoPosition) -> Result<()> {
        match self {
            Self::Logging(device) => device.move_to(position),
            Self::Recording(device) => device.move_to(position),
        }
    }

    fn release(&mut self) -> Result<()> {
        match self {
            Self::Logging(device) => device.release(),
            Self::Recording(device) => device.release(),
        }
    }
}
