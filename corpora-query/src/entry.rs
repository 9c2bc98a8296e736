//! Cache entry state and public snapshots.

use corpora_core::{FetchError, Timestamp};
use serde_json::Value;

/// Lifecycle status of a cached query.
///
/// Transitions: `Idle -> Loading -> {Success, Error}`; a refetch re-enters
/// `Loading` from either terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

impl QueryStatus {
    /// Whether the entry has reached a terminal state for the current fetch.
    pub fn is_settled(&self) -> bool {
        matches!(self, QueryStatus::Success | QueryStatus::Error)
    }
}

/// Point-in-time snapshot of a cache entry, as exposed to subscribers.
///
/// `data` is the result of the last *completed* fetch. An entry that failed
/// after a prior success keeps the last good data alongside the new error
/// (stale-while-error), so consumers can keep rendering something useful.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub data: Option<Value>,
    pub status: QueryStatus,
    pub error: Option<FetchError>,
    pub updated_at: Option<Timestamp>,
    pub stale: bool,
}

impl QueryState {
    pub(crate) fn idle() -> Self {
        Self {
            data: None,
            status: QueryStatus::Idle,
            error: None,
            updated_at: None,
            stale: false,
        }
    }

    /// Whether a fresh successful result is available.
    pub fn is_fresh(&self) -> bool {
        self.status == QueryStatus::Success && !self.stale
    }
}
