//! Mock device implementations for testing and development.
//!
//! This module provides simulated device implementations that can be observed
//! programmatically without requiring physical hardware.

pub mod actuator;

pub use actuator::{RecordingActuator, RecordingActuatorHandle};
