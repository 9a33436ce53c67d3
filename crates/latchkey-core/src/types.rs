use crate::{Result, constants::CARD_ID_LENGTH, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Card identifier as transmitted by the reader.
///
/// Always exactly [`CARD_ID_LENGTH`] ASCII bytes (hex digits in practice, but
/// any ASCII is accepted so alternate reader variants round-trip unchanged).
///
/// # Security
/// Equality is constant-time so allow-list scans do not leak how many
/// leading characters of a presented card matched a stored one.
#[derive(Clone, Copy, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardIdentifier([u8; CARD_ID_LENGTH]);

impl CardIdentifier {
    /// Build an identifier from raw reader bytes.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardFormat` if:
    /// - `bytes` is not exactly [`CARD_ID_LENGTH`] long
    /// - `bytes` contains non-ASCII data
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; CARD_ID_LENGTH] = bytes.try_into().map_err(|_| {
            Error::InvalidCardFormat(format!(
                "Card identifier must be {CARD_ID_LENGTH} bytes, got {}",
                bytes.len()
            ))
        })?;

        if !raw.is_ascii() {
            return Err(Error::InvalidCardFormat(
                "Card identifier must be ASCII".to_string(),
            ));
        }

        Ok(CardIdentifier(raw))
    }

    /// Raw identifier bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; CARD_ID_LENGTH] {
        &self.0
    }

    /// Identifier as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // ASCII by construction, so this never falls back.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl PartialEq for CardIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl std::hash::Hash for CardIdentifier {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for CardIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CardIdentifier").field(&self.as_str()).finish()
    }
}

impl fmt::Display for CardIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CardIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CardIdentifier::from_bytes(s.trim().as_bytes())
    }
}

impl TryFrom<String> for CardIdentifier {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CardIdentifier> for String {
    fn from(card: CardIdentifier) -> Self {
        card.as_str().to_owned()
    }
}

/// Where an authorization decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// Decided by the local allow-list (or no remote authority configured).
    Local,
    /// Answered by the remote authority.
    Remote,
    /// The remote authority refused, failed, or timed out.
    RemoteUnavailable,
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionSource::Local => write!(f, "Local"),
            DecisionSource::Remote => write!(f, "Remote"),
            DecisionSource::RemoteUnavailable => write!(f, "RemoteUnavailable"),
        }
    }
}

/// Outcome of authorizing one card read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    pub granted: bool,
    pub source: DecisionSource,
}

impl AuthorizationDecision {
    /// Granted by the local allow-list.
    #[inline]
    #[must_use]
    pub fn local_grant() -> Self {
        Self {
            granted: true,
            source: DecisionSource::Local,
        }
    }

    /// Denied locally with no remote authority to ask.
    #[inline]
    #[must_use]
    pub fn local_deny() -> Self {
        Self {
            granted: false,
            source: DecisionSource::Local,
        }
    }

    /// Granted by the remote authority.
    #[inline]
    #[must_use]
    pub fn remote_grant() -> Self {
        Self {
            granted: true,
            source: DecisionSource::Remote,
        }
    }

    /// Explicitly refused by the remote authority.
    #[inline]
    #[must_use]
    pub fn remote_deny() -> Self {
        Self {
            granted: false,
            source: DecisionSource::Remote,
        }
    }

    /// The remote authority could not grant access.
    #[inline]
    #[must_use]
    pub fn remote_unavailable() -> Self {
        Self {
            granted: false,
            source: DecisionSource::RemoteUnavailable,
        }
    }

    /// Returns `true` if access was granted.
    #[inline]
    #[must_use]
    pub fn is_granted(&self) -> bool {
        self.granted
    }
}

impl fmt::Display for AuthorizationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.granted { "granted" } else { "denied" };
        write!(f, "{verdict} ({})", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0123456789")]
    #[case("ABCDEF0123")]
    #[case("  00ab12cd34  ")]
    fn test_card_identifier_valid(#[case] input: &str) {
        let card: CardIdentifier = input.parse().unwrap();
        assert_eq!(card.as_str(), input.trim());
    }

    #[rstest]
    #[case("")]
    #[case("012345678")] // too short
    #[case("01234567890")] // too long
    #[case("01234567é")] // non-ASCII, 10 bytes
    fn test_card_identifier_invalid(#[case] input: &str) {
        let result: Result<CardIdentifier> = input.parse();
        assert!(matches!(result, Err(Error::InvalidCardFormat(_))));
    }

    #[test]
    fn test_card_identifier_equality_is_exact() {
        let a = CardIdentifier::from_bytes(b"00AB12CD34").unwrap();
        let b = CardIdentifier::from_bytes(b"00AB12CD34").unwrap();
        let lower = CardIdentifier::from_bytes(b"00ab12cd34").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, lower);
    }

    #[test]
    fn test_card_identifier_serde_as_string() {
        let card: CardIdentifier = "0123456789".parse().unwrap();
        let value: String = card.into();
        assert_eq!(value, "0123456789");

        let back = CardIdentifier::try_from(value).unwrap();
        assert_eq!(back, card);
    }

    #[test]
    fn test_card_identifier_display_and_debug() {
        let card: CardIdentifier = "0123456789".parse().unwrap();
        assert_eq!(card.to_string(), "0123456789");
        assert_eq!(format!("{card:?}"), "CardIdentifier(\"0123456789\")");
    }

    #[test]
    fn test_decision_constructors() {
        assert!(AuthorizationDecision::local_grant().is_granted());
        assert!(AuthorizationDecision::remote_grant().is_granted());
        assert!(!AuthorizationDecision::local_deny().is_granted());
        assert!(!AuthorizationDecision::remote_unavailable().is_granted());

        assert_eq!(
            AuthorizationDecision::remote_unavailable().source,
            DecisionSource::RemoteUnavailable
        );
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(
            AuthorizationDecision::local_grant().to_string(),
            "granted (Local)"
        );
        assert_eq!(
            AuthorizationDecision::remote_unavailable().to_string(),
            "denied (RemoteUnavailable)"
        );
    }
}
