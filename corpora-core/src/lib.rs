//! Core types shared across the corpora portal client.
//!
//! This crate holds the entity tag registry, the entity types returned by
//! the portal API, and the error types surfaced by the fetch layer. It
//! performs no I/O; everything here is plain data.

pub mod entities;
pub mod error;
pub mod tags;

pub use entities::{
    Collection, CollectionLink, CollectionSummary, CollectionVisibility, CollectionsResponse,
    CreateCollectionPayload, CreateCollectionResponse, DatasetSummary,
};
pub use error::{FetchError, FetchResult};
pub use tags::EntityTag;

/// Timestamp type used for cache bookkeeping and entity fields.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
