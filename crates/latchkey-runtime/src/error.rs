//! Errors raised while assembling a controller.
//!
//! The running controller itself never fails.

use latchkey_hardware::HardwareError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] latchkey_core::Error),

    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),
}
