//! Invalidation engine: tag-scoped cache refresh.
//!
//! Mutations report the entity tags they touched; every cached query whose
//! descriptor tag set intersects is marked stale. Entries with active
//! subscribers refetch immediately, the rest revalidate lazily. Data is
//! never mutated here; only a completed fetch may replace data.

use corpora_core::EntityTag;
use tracing::info;

use crate::client::QueryClient;
use crate::descriptor::QueryKey;

impl QueryClient {
    /// Mark every cached query depending on any of `tags` as stale.
    ///
    /// A composite query (e.g. a collection detail view tagged both
    /// Collection and Dataset) refreshes when either tag is invalidated; a
    /// query tagged Dataset alone is untouched by a Collection-only
    /// invalidation.
    pub fn invalidate(&self, tags: &[EntityTag]) {
        info!(?tags, "invalidating cached queries");
        self.mark_stale(|key: &QueryKey| key.descriptor().intersects(tags));
    }

    /// Mark explicit keys stale, bypassing tag matching.
    pub fn invalidate_keys(&self, keys: &[QueryKey]) {
        self.mark_stale(|key: &QueryKey| keys.contains(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::QueryDescriptor;
    use crate::entry::QueryStatus;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_invalidation_scoping_by_tag_intersection() {
        let client = QueryClient::default();
        let composite =
            QueryDescriptor::new("collection", [EntityTag::Collection, EntityTag::Dataset])
                .key_with(&["abc123"]);
        let dataset_only = QueryDescriptor::new("dataset", [EntityTag::Dataset]).key_with(&["d1"]);

        client.set_result(&composite, json!({"id": "abc123"}));
        client.set_result(&dataset_only, json!({"id": "d1"}));

        client.invalidate(&[EntityTag::Collection]);

        assert!(client.get(&composite).unwrap().stale);
        assert!(
            !client.get(&dataset_only).unwrap().stale,
            "dataset-only query untouched by collection invalidation"
        );
    }

    #[tokio::test]
    async fn test_invalidate_keys_bypasses_tags() {
        let client = QueryClient::default();
        let key = QueryDescriptor::new("collections", [EntityTag::Collection]).key();
        client.set_result(&key, json!([]));

        client.invalidate_keys(std::slice::from_ref(&key));
        assert!(client.get(&key).unwrap().stale);
    }

    #[tokio::test]
    async fn test_entry_with_subscriber_persists_through_invalidate_and_sweep() {
        let client = QueryClient::default();
        let key = QueryDescriptor::new("collections", [EntityTag::Collection]).key();

        let _sub = client.subscribe(&key, Arc::new(|_| {}));
        client.set_result(&key, json!([]));

        client.invalidate(&[EntityTag::Collection]);
        client.sweep();

        let state = client.get(&key).expect("live entry survives");
        // No fetcher registered, so the entry is flagged stale in place.
        assert!(state.stale);
        assert_eq!(state.status, QueryStatus::Success);
    }
}
