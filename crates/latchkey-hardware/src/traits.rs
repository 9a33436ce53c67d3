//! Hardware device trait definitions.
//!
//! The lock controller runs inside a fixed-period tick handler, so the
//! actuator interface is synchronous: a command only latches a new PWM target
//! or detaches the drive, it never waits for the mechanism to move.

use crate::error::Result;
use crate::types::ServoPosition;

/// Lock actuator abstraction.
///
/// An actuator moves the bolt to a position and holds it there until
/// released. There is no feedback: the caller infers completion from
/// elapsed time.
///
/// Implementations must be cheap to call from a tick handler.
///
/// # Examples
///
/// ```
/// use latchkey_hardware::traits::Actuator;
/// use latchkey_hardware::types::ServoPosition;
/// use latchkey_hardware::mock::RecordingActuator;
///
/// # fn main() -> latchkey_hardware::Result<()> {
/// let (mut actuator, handle) = RecordingActuator::new();
///
/// actuator.move_to(ServoPosition::new(180)?)?;
/// assert!(handle.is_engaged());
///
/// actuator.release()?;
/// assert!(!handle.is_engaged());
/// # Ok(())
/// # }
/// ```
pub trait Actuator: Send {
    /// Engage the drive and hold at `position`.
    ///
    /// Calling this while already engaged retargets the drive.
    ///
    /// # Errors
    ///
    /// Returns an error if the drive could not be commanded.
    fn move_to(&mut self, position: ServoPosition) -> Result<()>;

    /// Disengage the drive, dropping holding torque.
    ///
    /// # Errors
    ///
    /// Returns an error if the drive could not be commanded.
    fn release(&mut self) -> Result<()>;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn move_to(&mut self, position: ServoPosition) -> Result<()> {
        (**self).move_to(position)
    }

    fn release(&mut self) -> Result<()> {
        (**self).release()
    }
}
