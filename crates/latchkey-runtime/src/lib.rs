//! Door controller runtime.
//!
//! Ties the card reader, authorization and lock together in a single task.
//!
//! ```text
//! serial reader ──(bytes)──┐
//!                          │      ┌────────────────┐
//! door sensor ──(events)───┼─────►│ DoorController │──► Actuator
//!                          │      └────────────────┘
//! TickScheduler ──(ticks)──┘          │      ▲
//!                                     ▼      │
//!                              remote check (spawned)
//! ```

pub mod controller;
pub mod error;
pub mod scheduler;

pub use controller::{CardOutcome, ControllerInputs, ControllerStats, DoorController};
pub use error::{Result, RuntimeError};
pub use scheduler::TickScheduler;
