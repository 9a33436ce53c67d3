//! Remote authority seam.
//!
//! # Enum Dispatch Pattern
//!
//! [`AuthorizationService`](crate::AuthorizationService) is generic over its
//! authority. The binary decides from configuration whether a remote is
//! present, so [`AnyAuthority`] wraps the concrete choices.

use std::future::Future;

use latchkey_core::{AuthConfig, CardIdentifier};

use crate::error::Result;
use crate::http::HttpAuthority;

/// A remote service that can authorize cards and receive entry reports.
///
/// Futures must be `Send` so that checks can run on a spawned task while the
/// controller keeps ticking.
pub trait RemoteAuthority: Send + Sync + 'static {
    /// Whether this authority should be consulted at all.
    fn is_configured(&self) -> bool {
        true
    }

    /// Ask whether `card` may enter.
    ///
    /// `Ok(true)` grants, `Ok(false)` is an explicit denial, and any error
    /// means the authority could not be reached or gave no usable answer.
    fn check_card(&self, card: &CardIdentifier) -> impl Future<Output = Result<bool>> + Send;

    /// Report that `card` was let in.
    fn report_opened(&self, card: &CardIdentifier) -> impl Future<Output = Result<()>> + Send;
}

/// Authority used when no remote is configured. Never consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRemote;

impl RemoteAuthority for NoRemote {
    fn is_configured(&self) -> bool {
        false
    }

    async fn check_card(&self, _card: &CardIdentifier) -> Result<bool> {
        Ok(false)
    }

    async fn report_opened(&self, _card: &CardIdentifier) -> Result<()> {
        Ok(())
    }
}

/// Enum wrapper for authority dispatch.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyAuthority {
    Disabled(NoRemote),
    Http(HttpAuthority),
}

impl AnyAuthority {
    /// Pick the authority described by the `[auth]` section.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the base URL
    /// cannot carry the API paths.
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        match &config.remote_url {
            Some(url) => Ok(Self::Http(HttpAuthority::new(url, config.timeout())?)),
            None => Ok(Self::Disabled(NoRemote)),
        }
    }
}

impl RemoteAuthority for AnyAuthority {
    fn is_configured(&self) -> bool {
        match self {
            Self::Disabled(authority) => authority.is_configured(),
            Self::Http(authority) => authority.is_configured(),
        }
    }

    async fn check_card(&self, card: &CardIdentifier) -> Result<bool> {
        match self {
            Self::Disabled(authority) => authority.check_card(card).await,
            Self::Http(authority) => authority.check_card(card).await,
        }
    }

    async fn report_opened(&self, card: &CardIdentifier) -> Result<()> {
        match self {
            Self::Disabled(authority) => authority.report_opened(card).await,
            Self::Http(authority) => authority.report_opened(card).await,
        }
    }
}
