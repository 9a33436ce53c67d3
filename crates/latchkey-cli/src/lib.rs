//! Latchkey command-line front end.
//!
//! The binary in `main.rs` only parses arguments and sets up logging; the
//! subcommands live here so they can be tested.

pub mod commands;
pub mod door_input;
