//! Authorization decisions.
//!
//! # Decision Flow
//!
//! 1. **Allow-list**: a listed card is granted locally, no remote call
//! 2. **No remote**: an unlisted card is denied locally
//! 3. **Remote check**: a grant from the authority is a remote grant
//! 4. **Anything else**: explicit denial from the authority is a remote
//!    denial; errors, timeouts and non-success answers are
//!    `RemoteUnavailable`
//!
//! The local half is synchronous so the controller can resolve allow-listed
//! cards without leaving its event loop.

use std::sync::Arc;

use latchkey_core::{AuthorizationDecision, CardIdentifier};
use tracing::{debug, info, warn};

use crate::allow_list::AllowList;
use crate::remote::RemoteAuthority;

/// Allow-list plus optional remote authority.
///
/// Cloning is cheap and shares both halves, so a clone can be moved into a
/// spawned task.
#[derive(Debug)]
pub struct AuthorizationService<R> {
    allow_list: Arc<AllowList>,
    remote: Arc<R>,
}

impl<R> Clone for AuthorizationService<R> {
    fn clone(&self) -> Self {
        Self {
            allow_list: Arc::clone(&self.allow_list),
            remote: Arc::clone(&self.remote),
        }
    }
}

impl<R: RemoteAuthority> AuthorizationService<R> {
    pub fn new(allow_list: AllowList, remote: R) -> Self {
        Self {
            allow_list: Arc::new(allow_list),
            remote: Arc::new(remote),
        }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Whether unlisted cards are forwarded to a remote authority.
    pub fn has_remote(&self) -> bool {
        self.remote.is_configured()
    }

    /// Decide without any I/O.
    ///
    /// Returns `None` when the card is unlisted and the remote authority has
    /// to be asked.
    pub fn authorize_locally(&self, card: &CardIdentifier) -> Option<AuthorizationDecision> {
        if self.allow_list.contains(card) {
            debug!(card = %card, "Card found in allow-list");
            return Some(AuthorizationDecision::local_grant());
        }

        if self.has_remote() {
            None
        } else {
            debug!(card = %card, "Card not in allow-list and no remote configured");
            Some(AuthorizationDecision::local_deny())
        }
    }

    /// Ask the remote authority. Never fails; errors become
    /// `RemoteUnavailable`.
    pub async fn authorize_remotely(&self, card: &CardIdentifier) -> AuthorizationDecision {
        match self.remote.check_card(card).await {
            Ok(true) => AuthorizationDecision::remote_grant(),
            Ok(false) => AuthorizationDecision::remote_deny(),
            Err(e) => {
                warn!(card = %card, "Remote authorization failed: {}", e);
                AuthorizationDecision::remote_unavailable()
            }
        }
    }

    /// Full decision: allow-list first, remote authority second.
    pub async fn authorize(&self, card: &CardIdentifier) -> AuthorizationDecision {
        match self.authorize_locally(card) {
            Some(decision) => decision,
            None => self.authorize_remotely(card).await,
        }
    }

    /// Tell the remote authority that `card` was let in.
    ///
    /// Sent once. Failures are logged and otherwise ignored.
    pub async fn report_entry(&self, card: &CardIdentifier) {
        if !self.has_remote() {
            return;
        }

        match self.remote.report_opened(card).await {
            Ok(()) => info!(card = %card, "Entry reported"),
            Err(e) => warn!(card = %card, "Entry report failed: {}", e),
        }
    }
}
