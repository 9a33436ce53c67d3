//! Lock transition controller.
//!
//! Drives the lock actuator and keeps track of where the bolt is while it
//! travels, so that a transition interrupted halfway can be reversed for
//! exactly the distance already covered.

pub mod controller;
pub mod state;

pub use controller::{LockTiming, LockTransitionController};
pub use state::{LockState, LockTarget};
