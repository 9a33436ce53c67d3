//! Default constants for the door controller.
//!
//! These are the values the controller ships with. Every timing constant can
//! be overridden through [`ControllerConfig`](crate::config::ControllerConfig);
//! the card identifier length cannot, since readers emit fixed-size frames.
//!
//! # Timing model
//!
//! ```text
//!  card read ──► unlock (TRANSITION) ──► door opens ──► door closes
//!                                                           │
//!                                     lock (TRANSITION) ◄───┘
//!                                     └── revert window (REVERT_WINDOW) ──►
//! ```

// ============================================================================
// Card reader
// ============================================================================

/// Card identifier length, in ASCII-encoded hex characters.
pub const CARD_ID_LENGTH: usize = 10;

/// Typical gap between two consecutive card frames from the reader, in ms.
pub const DEFAULT_TIME_BETWEEN_FRAMES_MS: u64 = 50;

/// Numerator of the fraction of the frame gap after which a partial frame is
/// discarded.
pub const FRAME_GAP_NUMERATOR: u64 = 2;

/// Denominator of the fraction of the frame gap after which a partial frame
/// is discarded.
pub const FRAME_GAP_DENOMINATOR: u64 = 5;

/// Serial baud rate of the reader.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Marker expected at offsets 1..=2 of a prefixed reader frame.
pub const PREFIXED_FRAME_MARKER: &[u8; 2] = b"0x";

/// Framing bytes around the identifier in a prefixed reader frame.
pub const PREFIXED_FRAME_OVERHEAD: usize = 2;

// ============================================================================
// Lock mechanics
// ============================================================================

/// Tick period of the lock controller, in ms.
pub const DEFAULT_TICK_MS: u64 = 1;

/// Nominal time for the servo to travel between end positions, in ms.
///
/// The servo needs about 2 s; 300 ms are shaved off because the bolt is
/// already engaged before the horn reaches its end stop.
pub const DEFAULT_TRANSITION_MS: u64 = 2000 - 300;

/// Extra drive time added when an in-flight unlock is reversed into a lock,
/// in ms. Compensates for slack in the linkage when direction changes.
pub const DEFAULT_DRIFT_COMPENSATION_MS: u64 = 100;

/// Window after a lock command during which the lock may be reverted, in ms.
pub const DEFAULT_REVERT_WINDOW_MS: u64 = 3000;

/// Servo angle of the locked position, in degrees.
pub const DEFAULT_LOCK_ANGLE: u16 = 0;

/// Servo angle of the unlocked position, in degrees.
pub const DEFAULT_UNLOCK_ANGLE: u16 = 180;

/// Largest angle a hobby servo accepts, in degrees.
pub const MAX_SERVO_ANGLE: u16 = 180;

// ============================================================================
// Remote authority
// ============================================================================

/// Path of the card check endpoint, relative to the authority base URL.
pub const CHECK_CARD_PATH: &str = "api/v1/checkCard";

/// Path of the entry notification endpoint, relative to the authority base URL.
pub const OPENED_PATH: &str = "api/v1/opened";

/// Bound on a single remote call, in ms.
pub const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 3000;
