//! HTTP remote authority.
//!
//! # Endpoints
//!
//! | Call            | Method | Path               | Body                                  |
//! |-----------------|--------|--------------------|---------------------------------------|
//! | `check_card`    | POST   | `api/v1/checkCard` | `{"card": "<id>"}`                    |
//! | `report_opened` | PUT    | `api/v1/opened`    | `{"card": "<id>", "openedAt": "..."}` |
//!
//! Paths are resolved relative to the configured base URL. Any 2xx answer
//! to `checkCard` authorizes the card; the response body is ignored.
//!
//! Every request is bounded by the configured timeout. There is no retry:
//! a failed check is a denial and a failed report is dropped.

use std::time::Duration;

use chrono::{DateTime, Utc};
use latchkey_core::CardIdentifier;
use latchkey_core::constants::{CHECK_CARD_PATH, OPENED_PATH};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

use crate::error::{AuthError, Result};
use crate::remote::RemoteAuthority;

#[derive(Debug, Serialize)]
struct CheckCardRequest<'a> {
    card: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OpenedReport<'a> {
    card: &'a str,
    opened_at: DateTime<Utc>,
}

/// Remote authority reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAuthority {
    client: Client,
    check_url: Url,
    opened_url: Url,
    timeout: Duration,
}

impl HttpAuthority {
    /// Create an authority rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or `base_url`
    /// cannot be a base for the API paths.
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self> {
        let base = with_trailing_slash(base_url);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            check_url: base.join(CHECK_CARD_PATH)?,
            opened_url: base.join(OPENED_PATH)?,
            timeout,
        })
    }

    pub fn check_url(&self) -> &Url {
        &self.check_url
    }

    pub fn opened_url(&self) -> &Url {
        &self.opened_url
    }

    fn transport_error(&self, e: reqwest::Error) -> AuthError {
        if e.is_timeout() {
            AuthError::Timeout(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX))
        } else {
            AuthError::Http(e)
        }
    }
}

impl RemoteAuthority for HttpAuthority {
    async fn check_card(&self, card: &CardIdentifier) -> Result<bool> {
        debug!(card = %card, url = %self.check_url, "Checking card with remote authority");

        let response = self
            .client
            .post(self.check_url.clone())
            .json(&CheckCardRequest {
                card: card.as_str(),
            })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        trace!(card = %card, status = status.as_u16(), "Remote authority answered");

        if status.is_success() {
            Ok(true)
        } else {
            Err(AuthError::Rejected {
                status: status.as_u16(),
            })
        }
    }

    async fn report_opened(&self, card: &CardIdentifier) -> Result<()> {
        let report = OpenedReport {
            card: card.as_str(),
            opened_at: Utc::now(),
        };

        let response = self
            .client
            .put(self.opened_url.clone())
            .json(&report)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AuthError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

/// `Url::join` replaces the last path segment unless the base ends in `/`.
fn with_trailing_slash(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
