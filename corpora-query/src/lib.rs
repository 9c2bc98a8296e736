//! Client-side query cache and invalidation engine for the corpora portal.
//!
//! Logical queries are identified by a [`QueryDescriptor`] and cached under
//! a derived [`QueryKey`]. The [`QueryClient`] owns all entries and is the
//! only mutable shared state; reads subscribe through [`QueryHandle`]s and
//! writes go through [`Mutation`]s, which invalidate by [`EntityTag`] on
//! success.
//!
//! # Example
//!
//! ```ignore
//! use corpora_core::EntityTag;
//! use corpora_query::{FetchFn, Mutation, QueryClient, QueryDescriptor, QueryHandle};
//!
//! let client = QueryClient::default();
//!
//! let mut collections: QueryHandle<CollectionsResponse> = client.query(
//!     QueryDescriptor::new("collections", [EntityTag::Collection]),
//!     &[],
//!     FetchFn(move || { let api = api.clone(); async move { api.get_json("/dp/v1/collections").await } }),
//! );
//! let state = collections.wait_ready().await;
//!
//! let create = Mutation::new(&client, [EntityTag::Collection]);
//! let result = create.trigger(api.post_json("/dp/v1/collections", &payload)).await;
//! // On success, the collections list is already refetching.
//! ```

pub mod client;
pub mod descriptor;
pub mod entry;
pub mod invalidation;
pub mod mutation;
pub mod query;
pub mod retry;

pub use client::{Listener, QueryClient, Subscription};
pub use descriptor::{QueryDescriptor, QueryKey};
pub use entry::{QueryState, QueryStatus};
pub use mutation::{Mutation, MutationResult};
pub use query::{FetchFn, QueryFetcher, QueryHandle, TypedQueryState};
pub use retry::RetryPolicy;
