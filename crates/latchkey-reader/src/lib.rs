//! Card reader frame assembly.
//!
//! Serial RFID readers stream card identifiers as fixed-length ASCII frames,
//! repeating them while a card stays in the field. This crate turns that byte
//! stream back into discrete card reads, dropping corrupted frames and
//! resynchronizing after truncated ones.

pub mod assembler;
pub mod format;

pub use assembler::{AssemblerStats, CardFrameAssembler};
pub use format::FrameFormat;
