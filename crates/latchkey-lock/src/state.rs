//! Lock states.
//!
//! # States
//!
//! - `Locked`: bolt thrown, drive released
//! - `Unlocked`: bolt retracted, drive released
//! - `Transitioning`: drive engaged and moving toward `target`
//!
//! # Transitions
//!
//! ```text
//!            request_unlock                 on_tick (remaining = 0)
//! ┌────────┐ ─────────────► ┌─────────────────────────┐ ─────────────► ┌──────────┐
//! │ Locked │                │ Transitioning(Unlocked) │                │ Unlocked │
//! └────────┘ ◄───────────── └─────────────────────────┘                └──────────┘
//!     ^     on_tick               ▲        │ request_lock                    │
//!     │                           │        ▼ (reverse, + drift)              │
//!     │                  ┌───────────────────────┐         request_lock      │
//!     └──────────────────│ Transitioning(Locked) │ ◄─────────────────────────┘
//!                        └───────────────────────┘
//!                          request_unlock / revert (reverse)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// End position of the bolt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockTarget {
    Locked,
    Unlocked,
}

impl LockTarget {
    /// The other end position.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            LockTarget::Locked => LockTarget::Unlocked,
            LockTarget::Unlocked => LockTarget::Locked,
        }
    }
}

impl fmt::Display for LockTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockTarget::Locked => write!(f, "Locked"),
            LockTarget::Unlocked => write!(f, "Unlocked"),
        }
    }
}

/// Mechanical state of the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    /// Bolt thrown, drive released.
    Locked,

    /// Bolt retracted, drive released.
    Unlocked,

    /// Drive engaged and moving toward `target`.
    ///
    /// `remaining_ticks` is always at least 1; a transition that would have
    /// no duration settles immediately instead.
    Transitioning {
        target: LockTarget,
        remaining_ticks: u32,
    },
}

impl LockState {
    /// Settled state for an end position.
    #[must_use]
    pub fn settled(target: LockTarget) -> Self {
        match target {
            LockTarget::Locked => LockState::Locked,
            LockTarget::Unlocked => LockState::Unlocked,
        }
    }

    /// Where the bolt is, or is heading.
    #[must_use]
    pub fn target(&self) -> LockTarget {
        match self {
            LockState::Locked => LockTarget::Locked,
            LockState::Unlocked => LockTarget::Unlocked,
            LockState::Transitioning { target, .. } => *target,
        }
    }

    /// Ticks left before the current transition completes, zero when settled.
    #[must_use]
    pub fn remaining_ticks(&self) -> u32 {
        match self {
            LockState::Transitioning {
                remaining_ticks, ..
            } => *remaining_ticks,
            _ => 0,
        }
    }

    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        matches!(self, LockState::Transitioning { .. })
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockState::Locked => write!(f, "Locked"),
            LockState::Unlocked => write!(f, "Unlocked"),
            LockState::Transitioning {
                target,
                remaining_ticks,
            } => write!(f, "Transitioning({target}, {remaining_ticks} ticks)"),
        }
    }
}
