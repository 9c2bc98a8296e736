//! Mutation hook: write operations that invalidate related queries.

use corpora_core::{EntityTag, FetchError, FetchResult};
use std::future::Future;

use crate::client::QueryClient;

/// Outcome of a triggered mutation.
#[derive(Debug, Clone)]
pub struct MutationResult<T> {
    pub success: bool,
    pub payload: Option<T>,
    pub error: Option<FetchError>,
}

/// A write operation bound to the set of entity tags it affects.
///
/// On success the tags are invalidated *before* the result is returned, so
/// a caller observing the resolved mutation never sees pre-mutation data
/// served as fresh. On failure nothing is invalidated.
pub struct Mutation {
    client: QueryClient,
    tags: Vec<EntityTag>,
}

impl Mutation {
    pub fn new(client: &QueryClient, tags: impl Into<Vec<EntityTag>>) -> Self {
        Self {
            client: client.clone(),
            tags: tags.into(),
        }
    }

    pub fn tags(&self) -> &[EntityTag] {
        &self.tags
    }

    /// Run the write operation; invalidate the bound tags iff it succeeds.
    pub async fn trigger<T, Fut>(&self, op: Fut) -> MutationResult<T>
    where
        Fut: Future<Output = FetchResult<T>>,
    {
        match op.await {
            Ok(payload) => {
                self.client.invalidate(&self.tags);
                MutationResult {
                    success: true,
                    payload: Some(payload),
                    error: None,
                }
            }
            Err(error) => MutationResult {
                success: false,
                payload: None,
                error: Some(error),
            },
        }
    }
}
