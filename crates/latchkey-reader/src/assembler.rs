//! Card frame assembler.
//!
//! The reader transmits the identifier of a card in the field as a
//! fixed-length frame, repeated roughly every `time_between_frames` ms. The
//! serial line gives no byte-level framing, so the assembler relies on two
//! rules:
//!
//! - a frame is complete when exactly `frame_len` bytes have arrived;
//! - a partial frame followed by silence longer than a fraction of the frame
//!   gap is a truncated frame and is thrown away.
//!
//! ```text
//!            on_byte_received            buffer full
//! ┌───────┐ ─────────────────► ┌───────┐ ──────────► validate ──► emit / drop
//! │ Empty │                    │Partial│                 │
//! └───────┘ ◄───────────────── └───────┘                 │
//!     ^       on_tick: silence >= gap threshold          │
//!     └──────────────────────────────────────────────────┘
//! ```
//!
//! Without the timeout, one lost byte would misalign every later frame: the
//! first byte of frame `n+1` would complete frame `n`, and so on forever.
//!
//! # Example
//!
//! ```
//! use std::time::{Duration, Instant};
//! use latchkey_reader::{CardFrameAssembler, FrameFormat};
//!
//! let start = Instant::now();
//! let mut assembler = CardFrameAssembler::new(FrameFormat::Plain, Duration::from_millis(20));
//!
//! let cards = assembler.on_bytes_received(b"00AB12CD34", start);
//! assert_eq!(cards.len(), 1);
//! assert_eq!(cards[0].as_str(), "00AB12CD34");
//! ```

use std::time::{Duration, Instant};

use bytes::BytesMut;
use latchkey_core::CardIdentifier;
use latchkey_core::config::ReaderConfig;
use tracing::{debug, trace};

use crate::format::FrameFormat;

/// Running counters for a [`CardFrameAssembler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblerStats {
    /// Full frames that passed validation.
    pub frames_accepted: u64,

    /// Full frames that failed validation.
    pub frames_rejected: u64,

    /// Partial frames discarded after an inter-frame gap.
    pub frames_discarded: u64,
}

/// Reassembles card identifiers from the reader byte stream.
///
/// The assembler owns its buffer and timestamps exclusively; timestamps are
/// passed in by the caller so it can be driven from an interrupt handler, an
/// async task, or a test with synthetic time.
#[derive(Debug)]
pub struct CardFrameAssembler {
    format: FrameFormat,

    /// Bytes of the frame currently being received. Never holds a full frame
    /// between calls.
    buffer: BytesMut,

    /// When the most recent byte arrived.
    last_received: Option<Instant>,

    /// Silence after which a partial frame is discarded.
    gap_threshold: Duration,

    stats: AssemblerStats,
}

impl CardFrameAssembler {
    /// Create an assembler for one reader format.
    pub fn new(format: FrameFormat, gap_threshold: Duration) -> Self {
        Self {
            format,
            buffer: BytesMut::with_capacity(format.frame_len()),
            last_received: None,
            gap_threshold,
            stats: AssemblerStats::default(),
        }
    }

    /// Create an assembler from reader configuration.
    pub fn from_config(config: &ReaderConfig) -> Self {
        Self::new(config.format.into(), config.frame_gap_threshold())
    }

    /// Feed one byte from the reader.
    ///
    /// When the byte completes a frame, the frame is validated and the buffer
    /// is emptied before returning, whether or not the frame was valid.
    /// Returns the identifier if a valid frame was completed.
    pub fn on_byte_received(&mut self, byte: u8, timestamp: Instant) -> Option<CardIdentifier> {
        self.buffer.extend_from_slice(&[byte]);
        self.last_received = Some(timestamp);

        if self.buffer.len() < self.format.frame_len() {
            return None;
        }

        let frame = self.buffer.split();
        self.buffer.reserve(self.format.frame_len());

        match self.format.extract(&frame) {
            Some(card) => {
                self.stats.frames_accepted += 1;
                trace!(card = %card, "Card frame assembled");
                Some(card)
            }
            None => {
                self.stats.frames_rejected += 1;
                debug!(
                    frame = %frame.escape_ascii(),
                    format = ?self.format,
                    "Dropping invalid card frame"
                );
                None
            }
        }
    }

    /// Feed a chunk of bytes that arrived together.
    ///
    /// Equivalent to calling [`on_byte_received`](Self::on_byte_received)
    /// for each byte with the same timestamp.
    pub fn on_bytes_received(&mut self, bytes: &[u8], timestamp: Instant) -> Vec<CardIdentifier> {
        bytes
            .iter()
            .filter_map(|&byte| self.on_byte_received(byte, timestamp))
            .collect()
    }

    /// Periodic timeout check.
    ///
    /// Discards a partial frame once the line has been silent for at least
    /// the gap threshold. Returns `true` if a partial frame was discarded.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        if self.buffer.is_empty() {
            return false;
        }

        let silent_for = self
            .last_received
            .map_or(Duration::MAX, |last| now.saturating_duration_since(last));

        if silent_for < self.gap_threshold {
            return false;
        }

        debug!(
            received = self.buffer.len(),
            expected = self.format.frame_len(),
            "Discarding truncated card frame"
        );
        self.buffer.clear();
        self.stats.frames_discarded += 1;
        true
    }

    /// Bytes of the frame currently being received.
    pub fn fill(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` if no partial frame is buffered.
    pub fn is_idle(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn frame_format(&self) -> FrameFormat {
        self.format
    }

    pub fn gap_threshold(&self) -> Duration {
        self.gap_threshold
    }

    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAP: Duration = Duration::from_millis(20);

    fn ms(start: Instant, offset: u64) -> Instant {
        start + Duration::from_millis(offset)
    }

    #[test]
    fn test_full_frame_emits_and_resets() {
        let start = Instant::now();
        let mut assembler = CardFrameAssembler::new(FrameFormat::Plain, GAP);

        for &byte in &b"00AB12CD3"[..] {
            assert!(assembler.on_byte_received(byte, start).is_none());
        }
        assert_eq!(assembler.fill(), 9);

        let card = assembler.on_byte_received(b'4', start).unwrap();
        assert_eq!(card.as_str(), "00AB12CD34");
        assert!(assembler.is_idle());
        assert_eq!(assembler.stats().frames_accepted, 1);
    }

    #[test]
    fn test_back_to_back_frames() {
        let start = Instant::now();
        let mut assembler = CardFrameAssembler::new(FrameFormat::Plain, GAP);

        let cards = assembler.on_bytes_received(b"00AB12CD3400AB12CD34", start);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0], cards[1]);
    }

    #[test]
    fn test_partial_frame_discarded_after_gap() {
        let start = Instant::now();
        let mut assembler = CardFrameAssembler::new(FrameFormat::Plain, GAP);

        assembler.on_bytes_received(b"00AB", start);
        assert!(!assembler.on_tick(ms(start, 19)));
        assert_eq!(assembler.fill(), 4);

        assert!(assembler.on_tick(ms(start, 20)));
        assert!(assembler.is_idle());
        assert_eq!(assembler.stats().frames_discarded, 1);

        // Next frame starts from a clean buffer.
        let cards = assembler.on_bytes_received(b"0011223344", ms(start, 50));
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].as_str(), "0011223344");
    }

    #[test]
    fn test_gap_measured_from_last_byte() {
        let start = Instant::now();
        let mut assembler = CardFrameAssembler::new(FrameFormat::Plain, GAP);

        assembler.on_bytes_received(b"00AB", start);
        assembler.on_bytes_received(b"12", ms(start, 15));

        assert!(!assembler.on_tick(ms(start, 30)));
        assert_eq!(assembler.fill(), 6);
        assert!(assembler.on_tick(ms(start, 35)));
    }

    #[test]
    fn test_tick_on_empty_buffer_is_noop() {
        let start = Instant::now();
        let mut assembler = CardFrameAssembler::new(FrameFormat::Plain, GAP);

        assert!(!assembler.on_tick(ms(start, 1000)));
        assert_eq!(assembler.stats(), AssemblerStats::default());
    }

    #[test]
    fn test_invalid_prefixed_frame_dropped_and_reset() {
        let start = Instant::now();
        let mut assembler = CardFrameAssembler::new(FrameFormat::Prefixed, GAP);

        let cards = assembler.on_bytes_received(b"\x0200AB12CD34\n", start);
        assert!(cards.is_empty());
        assert!(assembler.is_idle());
        assert_eq!(assembler.stats().frames_rejected, 1);

        let cards = assembler.on_bytes_received(b"\x020xAB12CD34\n", ms(start, 50));
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].as_str(), "0xAB12CD34");
    }

    #[test]
    fn test_misaligned_stream_without_gap_stays_misaligned() {
        // Documents why the gap check exists: a lost byte shifts every frame
        // until the line goes quiet.
        let start = Instant::now();
        let mut assembler = CardFrameAssembler::new(FrameFormat::Plain, GAP);

        let cards = assembler.on_bytes_received(b"0AB12CD3400AB12CD34", start);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].as_str(), "0AB12CD340");
        assert_eq!(assembler.fill(), 9);
    }

    #[test]
    fn test_from_config() {
        let config = ReaderConfig::default();
        let assembler = CardFrameAssembler::from_config(&config);

        assert_eq!(assembler.frame_format(), FrameFormat::Plain);
        assert_eq!(assembler.gap_threshold(), Duration::from_millis(20));
    }
}
