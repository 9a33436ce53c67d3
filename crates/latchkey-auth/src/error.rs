//! Error types for remote authorization.
//!
//! None of these reach the door: the service turns every remote error into
//! a `RemoteUnavailable` denial.

use thiserror::Error;

/// Result type alias for authorization operations.
pub type Result<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Transport-level failure talking to the remote authority.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote authority answered with a non-success status.
    #[error("Remote authority rejected request with status {status}")]
    Rejected { status: u16 },

    /// Request did not complete within the configured bound.
    #[error("Remote authority timed out after {0}ms")]
    Timeout(u64),

    /// Remote authority base URL cannot carry the API paths.
    #[error("Invalid remote authority URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
