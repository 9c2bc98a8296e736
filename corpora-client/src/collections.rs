//! Collections API bound to the query cache.
//!
//! Each read is registered under a stable descriptor so mutations can
//! invalidate it by tag: the listing is tagged Collection; a collection
//! detail embeds datasets and carries both Collection and Dataset, so a
//! dataset mutation refreshes it too.

use serde_json::Value;

use corpora_core::{
    Collection, CollectionSummary, CreateCollectionPayload, CreateCollectionResponse, EntityTag,
    FetchError, FetchResult,
};
use corpora_query::{
    FetchFn, Mutation, MutationResult, QueryClient, QueryDescriptor, QueryHandle,
};

use crate::api::endpoints;
use crate::fetch::FetchExecutor;
use crate::template::api_template_to_url;

/// Descriptor for the collections listing.
pub fn collections_descriptor() -> QueryDescriptor {
    QueryDescriptor::new("collections", [EntityTag::Collection])
}

/// Descriptor for a single collection detail (embeds datasets).
pub fn collection_descriptor() -> QueryDescriptor {
    QueryDescriptor::new("collection", [EntityTag::Collection, EntityTag::Dataset])
}

/// Collections operations wired through the cache store.
#[derive(Clone)]
pub struct CollectionsApi {
    client: QueryClient,
    api: FetchExecutor,
}

impl CollectionsApi {
    pub fn new(client: &QueryClient, api: FetchExecutor) -> Self {
        Self {
            client: client.clone(),
            api,
        }
    }

    /// Subscribe to the collections listing, fetching it if stale or
    /// missing.
    pub fn use_collections(&self) -> QueryHandle<Vec<CollectionSummary>> {
        let api = self.api.clone();
        self.client.query(
            collections_descriptor(),
            &[],
            FetchFn(move || {
                let api = api.clone();
                async move {
                    let body: Value = api.get_json(endpoints::COLLECTIONS).await?;
                    body.get("collections")
                        .cloned()
                        .ok_or_else(|| FetchError::Decode {
                            reason: "response missing 'collections'".to_string(),
                        })
                }
            }),
        )
    }

    /// Subscribe to one collection's detail view.
    pub fn use_collection(&self, id: &str) -> FetchResult<QueryHandle<Collection>> {
        let path = api_template_to_url(endpoints::COLLECTION, &[("id", id)])?;
        let api = self.api.clone();
        Ok(self.client.query(
            collection_descriptor(),
            &[id],
            FetchFn(move || {
                let api = api.clone();
                let path = path.clone();
                async move { api.get_json(&path).await }
            }),
        ))
    }

    /// Create a collection. On success every query tagged Collection is
    /// invalidated, so the listing refetches with the new entry.
    pub async fn create_collection(
        &self,
        payload: &CreateCollectionPayload,
    ) -> MutationResult<CreateCollectionResponse> {
        let mutation = Mutation::new(&self.client, [EntityTag::Collection]);
        let api = self.api.clone();
        let body = payload.clone();
        mutation
            .trigger(async move {
                api.post_json::<CreateCollectionResponse, _>(endpoints::CREATE_COLLECTION, &body)
                    .await
            })
            .await
    }

    /// Cancel an in-progress dataset upload. Invalidates Dataset-tagged
    /// queries on success, which includes any open collection detail.
    pub async fn cancel_dataset_upload(&self, dataset_id: &str) -> MutationResult<Value> {
        let mutation = Mutation::new(&self.client, [EntityTag::Dataset]);
        let api = self.api.clone();
        let path = match api_template_to_url(endpoints::DATASET, &[("id", dataset_id)]) {
            Ok(path) => path,
            Err(error) => {
                return MutationResult {
                    success: false,
                    payload: None,
                    error: Some(error),
                }
            }
        };
        mutation
            .trigger(async move { api.delete_json::<Value>(&path).await })
            .await
    }
}
