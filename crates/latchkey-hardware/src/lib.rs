//! Hardware abstraction layer for the Latchkey door controller.
//!
//! The controller core never touches hardware directly. It talks to:
//!
//! - an [`Actuator`] that moves the bolt and holds it (servo or solenoid);
//! - a byte source for the card reader, forwarded by [`serial`] into a
//!   channel;
//! - a stream of debounced [`DoorEvent`]s from the door sensor and manual
//!   switches.
//!
//! # Mock Implementations
//!
//! [`mock::RecordingActuator`] records every command for tests, and
//! [`devices::LoggingActuator`] logs commands for bench setups without a
//! drive attached.
//!
//! [`Actuator`]: traits::Actuator
//! [`DoorEvent`]: types::DoorEvent

pub mod devices;
pub mod error;
pub mod mock;
pub mod serial;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::{AnyActuator, LoggingActuator};
pub use error::{HardwareError, Result};
pub use serial::{SerialReaderConfig, forward_bytes, spawn_serial_reader};
pub use traits::Actuator;
pub use types::{ActuatorCommand, DoorEvent, ServoPosition};
