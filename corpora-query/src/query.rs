//! Query hook: the read-side surface bound into views.
//!
//! A [`QueryHandle`] subscribes to the cache store for one key, triggers a
//! fetch when no fresh entry exists, and exposes typed snapshots of the
//! entry. Dropping the handle unsubscribes; an in-flight fetch is never
//! aborted by an unsubscribe since other subscribers may still depend on
//! it.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tracing::warn;

use corpora_core::{FetchError, FetchResult, Timestamp};

use crate::client::{QueryClient, Subscription};
use crate::descriptor::{QueryDescriptor, QueryKey};
use crate::entry::{QueryState, QueryStatus};

/// The seam between the cache and the network: produces the raw JSON value
/// for one query. Registered per key so invalidation can re-run it.
#[async_trait]
pub trait QueryFetcher: Send + Sync + 'static {
    async fn fetch(&self) -> FetchResult<Value>;
}

/// Adapter turning an async closure into a [`QueryFetcher`].
pub struct FetchFn<F>(pub F);

#[async_trait]
impl<F, Fut> QueryFetcher for FetchFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = FetchResult<Value>> + Send + 'static,
{
    async fn fetch(&self) -> FetchResult<Value> {
        (self.0)().await
    }
}

/// Typed view of a cache entry snapshot.
#[derive(Debug, Clone)]
pub struct TypedQueryState<T> {
    pub data: Option<T>,
    pub status: QueryStatus,
    pub error: Option<FetchError>,
    pub updated_at: Option<Timestamp>,
    pub stale: bool,
}

/// Live subscription to one query, with typed access to its state.
pub struct QueryHandle<T> {
    client: QueryClient,
    key: QueryKey,
    rx: watch::Receiver<QueryState>,
    _subscription: Subscription,
    _marker: PhantomData<fn() -> T>,
}

impl QueryClient {
    /// Issue a query: derive the key, subscribe, and fetch unless a fresh
    /// cached result exists. Concurrent callers for the same key coalesce
    /// onto a single in-flight fetch.
    pub fn query<T, F>(
        &self,
        descriptor: QueryDescriptor,
        positional: &[&str],
        fetcher: F,
    ) -> QueryHandle<T>
    where
        T: DeserializeOwned,
        F: QueryFetcher,
    {
        let key = descriptor.key_with(positional);
        let (tx, rx) = watch::channel(QueryState::idle());

        // Seeded subscribe: the channel receives the current entry state
        // under the same lock that registers the listener, so no update
        // can land between the snapshot and the registration.
        let subscription = self.subscribe_seeded(
            &key,
            Arc::new(move |state: &QueryState| {
                tx.send_replace(state.clone());
            }),
        );

        self.ensure_fetch(&key, Arc::new(fetcher));

        QueryHandle {
            client: self.clone(),
            key,
            rx,
            _subscription: subscription,
            _marker: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> QueryHandle<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current typed snapshot.
    pub fn state(&self) -> TypedQueryState<T> {
        typed(self.rx.borrow().clone())
    }

    /// Wait until the next entry change and return the new snapshot.
    pub async fn changed(&mut self) -> TypedQueryState<T> {
        let _ = self.rx.changed().await;
        self.state()
    }

    /// Wait until the current fetch settles (Success or Error).
    pub async fn wait_ready(&mut self) -> TypedQueryState<T> {
        loop {
            let snapshot = self.rx.borrow().clone();
            if snapshot.status.is_settled() {
                return typed(snapshot);
            }
            if self.rx.changed().await.is_err() {
                return typed(self.rx.borrow().clone());
            }
        }
    }

    /// Force a refetch (coalescing with any in-flight one) and wait for it
    /// to settle.
    pub async fn refetch(&mut self) -> TypedQueryState<T> {
        self.client.refetch(&self.key);
        // The entry is now Loading (or joined an in-flight fetch); wait for
        // the next settled state.
        self.wait_ready().await
    }
}

fn typed<T: DeserializeOwned>(state: QueryState) -> TypedQueryState<T> {
    let (data, decode_error) = match state.data {
        Some(value) => match serde_json::from_value::<T>(value) {
            Ok(data) => (Some(data), None),
            Err(err) => {
                warn!(%err, "cached value failed typed decode");
                (
                    None,
                    Some(FetchError::Decode {
                        reason: err.to_string(),
                    }),
                )
            }
        },
        None => (None, None),
    };
    TypedQueryState {
        data,
        status: state.status,
        error: state.error.or(decode_error),
        updated_at: state.updated_at,
        stale: state.stale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpora_core::EntityTag;
    use serde_json::json;

    #[tokio::test]
    async fn test_query_fetches_and_decodes() {
        let client = QueryClient::default();
        let descriptor = QueryDescriptor::new("collections", [EntityTag::Collection]);

        let mut handle: QueryHandle<Vec<u32>> = client.query(
            descriptor,
            &[],
            FetchFn(|| async { Ok(json!([1, 2, 3])) }),
        );

        let state = handle.wait_ready().await;
        assert_eq!(state.status, QueryStatus::Success);
        assert_eq!(state.data, Some(vec![1, 2, 3]));
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_fetch() {
        let client = QueryClient::default();
        let descriptor = QueryDescriptor::new("collections", [EntityTag::Collection]);
        let key = descriptor.key();
        client.set_result(&key, json!([9]));

        let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let mut handle: QueryHandle<Vec<u32>> = client.query(
            descriptor,
            &[],
            FetchFn(move || {
                counter_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async { Ok(json!([0])) }
            }),
        );

        let state = handle.wait_ready().await;
        assert_eq!(state.data, Some(vec![9]));
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handle_sees_cached_state_at_subscribe_time() {
        let client = QueryClient::default();
        let descriptor = QueryDescriptor::new("collections", [EntityTag::Collection]);
        client.set_result(&descriptor.key(), json!([4]));

        let handle: QueryHandle<Vec<u32>> =
            client.query(descriptor, &[], FetchFn(|| async { Ok(json!([0])) }));

        // The snapshot is seeded before query() returns; no await needed.
        let state = handle.state();
        assert_eq!(state.status, QueryStatus::Success);
        assert_eq!(state.data, Some(vec![4]));
    }

    #[tokio::test]
    async fn test_decode_failure_surfaces_as_decode_error() {
        let client = QueryClient::default();
        let descriptor = QueryDescriptor::new("collections", [EntityTag::Collection]);

        let mut handle: QueryHandle<Vec<u32>> = client.query(
            descriptor,
            &[],
            FetchFn(|| async { Ok(json!({"not": "a list"})) }),
        );

        let state = handle.wait_ready().await;
        assert!(state.data.is_none());
        assert!(matches!(state.error, Some(FetchError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_remote_4xx_not_retried() {
        let client = QueryClient::default();
        let descriptor = QueryDescriptor::new("collections", [EntityTag::Collection]);

        let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let mut handle: QueryHandle<Vec<u32>> = client.query(
            descriptor,
            &[],
            FetchFn(move || {
                counter_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async {
                    Err(FetchError::Remote {
                        status: 401,
                        body: "login required".to_string(),
                    })
                }
            }),
        );

        let state = handle.wait_ready().await;
        assert_eq!(state.status, QueryStatus::Error);
        assert_eq!(state.error.as_ref().and_then(FetchError::status), Some(401));
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transport_failures_retried_within_bounds() {
        let policy = crate::retry::RetryPolicy {
            max_attempts: 3,
            initial_backoff: std::time::Duration::from_millis(1),
            multiplier: 1.0,
            jitter: std::time::Duration::ZERO,
        };
        let client = QueryClient::new(policy);
        let descriptor = QueryDescriptor::new("collections", [EntityTag::Collection]);

        let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let mut handle: QueryHandle<Vec<u32>> = client.query(
            descriptor,
            &[],
            FetchFn(move || {
                let n = counter_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(FetchError::Transport {
                            reason: "connection reset".to_string(),
                        })
                    } else {
                        Ok(json!([7]))
                    }
                }
            }),
        );

        let state = handle.wait_ready().await;
        assert_eq!(state.data, Some(vec![7]));
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 3);
    }
}
