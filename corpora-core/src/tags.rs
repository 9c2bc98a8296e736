//! Entity tag registry.
//!
//! Tags label queries by the resource kind they depend on. They are used
//! exclusively for invalidation grouping: a mutation reports which tags it
//! touched, and every cached query whose tag set intersects is refreshed.
//! Tags never describe data shape.

use serde::{Deserialize, Serialize};

/// Logical resource kinds served by the portal API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityTag {
    Collection,
    Dataset,
}

impl EntityTag {
    /// Stable label used in log output and cache diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityTag::Collection => "collection",
            EntityTag::Dataset => "dataset",
        }
    }
}

impl std::fmt::Display for EntityTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
