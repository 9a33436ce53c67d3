//! Local allow-list.

use latchkey_core::{AuthConfig, CardIdentifier};

/// Cards granted without contacting the remote authority.
///
/// Lookups are a linear scan with constant-time comparisons per entry; the
/// list is expected to hold a handful of cards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    cards: Vec<CardIdentifier>,
}

impl AllowList {
    pub fn new(cards: impl IntoIterator<Item = CardIdentifier>) -> Self {
        Self {
            cards: cards.into_iter().collect(),
        }
    }

    /// Build the list from the `[auth]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns `latchkey_core::Error::Config` for a malformed entry.
    pub fn from_config(config: &AuthConfig) -> latchkey_core::Result<Self> {
        Ok(Self::new(config.allow_list()?))
    }

    pub fn contains(&self, card: &CardIdentifier) -> bool {
        self.cards.iter().any(|entry| entry == card)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CardIdentifier> {
        self.cards.iter()
    }
}

impl FromIterator<CardIdentifier> for AllowList {
    fn from_iter<I: IntoIterator<Item = CardIdentifier>>(iter: I) -> Self {
        Self::new(iter)
    }
}
