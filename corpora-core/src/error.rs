//! Error types for portal fetch operations.
//!
//! These errors are stored inside cache entries, so they are `Clone` and
//! `PartialEq` and carry their sources as plain strings rather than holding
//! onto transport-layer error types.

use thiserror::Error;

/// Result alias for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Failures surfaced by the fetch layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Network-level failure: DNS, connection reset, timeout.
    #[error("Transport failure: {reason}")]
    Transport { reason: String },

    /// The server answered with a non-2xx status.
    #[error("Remote error {status}: {body}")]
    Remote { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("Failed to decode response body: {reason}")]
    Decode { reason: String },

    /// A URL template referenced a parameter the caller did not supply.
    /// This is a programming error, not a runtime condition.
    #[error("Missing URL template parameter: {name}")]
    MissingParameter { name: String },
}

impl FetchError {
    /// Whether a bounded retry is worth attempting.
    ///
    /// Only transport failures are transient. Remote 4xx responses are
    /// client errors and will not resolve on their own; 5xx responses are
    /// left to the caller to refetch explicitly.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transport { .. })
    }

    /// The HTTP status code, when the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}
