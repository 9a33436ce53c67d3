//! Reader frame formats.
//!
//! Two reader variants are deployed in the field and they are not wire
//! compatible, so exactly one format is chosen when the assembler is built.
//!
//! ```text
//! Plain:     |  C  C  C  C  C  C  C  C  C  C |            (CARD_ID_LENGTH)
//! Prefixed:  | P | 0  x  C  C  C  C  C  C  C  C | S |     (CARD_ID_LENGTH + 2)
//!              ^                                  ^
//!              prefix byte                        suffix byte
//! ```

use latchkey_core::constants::{CARD_ID_LENGTH, PREFIXED_FRAME_MARKER, PREFIXED_FRAME_OVERHEAD};
use latchkey_core::{CardIdentifier, FrameFormatKind};

/// Validation and extraction policy for one reader variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// Bare identifier frames. The reader's electrical framing guarantees
    /// correctness, so every full frame is accepted.
    Plain,

    /// Identifier wrapped in a prefix and suffix byte. Only frames whose
    /// identifier starts with `0x` are accepted; this variant is noisier and
    /// the marker is the only integrity check available.
    Prefixed,
}

impl FrameFormat {
    /// Number of bytes in one complete frame.
    #[must_use]
    pub fn frame_len(self) -> usize {
        match self {
            FrameFormat::Plain => CARD_ID_LENGTH,
            FrameFormat::Prefixed => CARD_ID_LENGTH + PREFIXED_FRAME_OVERHEAD,
        }
    }

    /// Validate a complete frame and extract its identifier.
    ///
    /// Returns `None` if the frame has the wrong length, fails the format's
    /// validation, or carries non-ASCII identifier bytes.
    #[must_use]
    pub fn extract(self, frame: &[u8]) -> Option<CardIdentifier> {
        if frame.len() != self.frame_len() {
            return None;
        }

        let id = match self {
            FrameFormat::Plain => frame,
            FrameFormat::Prefixed => {
                let id = &frame[1..=CARD_ID_LENGTH];
                if !id.starts_with(PREFIXED_FRAME_MARKER) {
                    return None;
                }
                id
            }
        };

        CardIdentifier::from_bytes(id).ok()
    }
}

impl From<FrameFormatKind> for FrameFormat {
    fn from(kind: FrameFormatKind) -> Self {
        match kind {
            FrameFormatKind::Plain => FrameFormat::Plain,
            FrameFormatKind::Prefixed => FrameFormat::Prefixed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_frame_lengths() {
        assert_eq!(FrameFormat::Plain.frame_len(), 10);
        assert_eq!(FrameFormat::Prefixed.frame_len(), 12);
    }

    #[rstest]
    #[case(b"00AB12CD34".as_slice(), Some("00AB12CD34"))]
    #[case(b"zzzzzzzzzz".as_slice(), Some("zzzzzzzzzz"))]
    #[case(b"00AB12CD3".as_slice(), None)]
    #[case(b"00AB12CD34\n".as_slice(), None)]
    #[case(&[0x30, 0x30, 0x41, 0x42, 0x31, 0x32, 0x43, 0x44, 0x33, 0xFF], None)]
    fn test_plain_extract(#[case] frame: &[u8], #[case] expected: Option<&str>) {
        let card = FrameFormat::Plain.extract(frame);
        assert_eq!(card.as_ref().map(CardIdentifier::as_str), expected);
    }

    #[rstest]
    #[case(b"\x020xAB12CD34\n".as_slice(), Some("0xAB12CD34"))]
    #[case(b"S0x00000001\r".as_slice(), Some("0x00000001"))]
    #[case(b"\x0200AB12CD34\n".as_slice(), None)] // missing marker
    #[case(b"0xAB12CD34\n\n".as_slice(), None)] // marker at wrong offset
    #[case(b"0xAB12CD34".as_slice(), None)] // plain-length frame
    fn test_prefixed_extract(#[case] frame: &[u8], #[case] expected: Option<&str>) {
        let card = FrameFormat::Prefixed.extract(frame);
        assert_eq!(card.as_ref().map(CardIdentifier::as_str), expected);
    }

    #[test]
    fn test_from_config_kind() {
        assert_eq!(FrameFormat::from(FrameFormatKind::Plain), FrameFormat::Plain);
        assert_eq!(
            FrameFormat::from(FrameFormatKind::Prefixed),
            FrameFormat::Prefixed
        );
    }
}
