//! HTTP client for the corpora data portal, layered over the query cache.
//!
//! [`PortalClient`] bundles the shared [`QueryClient`] cache with the
//! [`FetchExecutor`] and the per-resource API surfaces. One instance is
//! created at application start and passed by reference to views; it is
//! cheap to clone and all clones share the same cache.

pub mod api;
pub mod collections;
pub mod config;
pub mod fetch;
pub mod template;

pub use api::{endpoints, login_url, query_parameters, routes};
pub use collections::{collection_descriptor, collections_descriptor, CollectionsApi};
pub use config::{ConfigError, PortalConfig, RetryConfig};
pub use fetch::FetchExecutor;
pub use template::api_template_to_url;

use corpora_core::FetchResult;
use corpora_query::QueryClient;

/// Entry point tying the cache store and the HTTP surfaces together.
#[derive(Clone)]
pub struct PortalClient {
    query: QueryClient,
    executor: FetchExecutor,
    collections: CollectionsApi,
    login_url: String,
}

impl PortalClient {
    pub fn new(config: &PortalConfig) -> FetchResult<Self> {
        let query = QueryClient::new(config.retry_policy());
        let executor = FetchExecutor::new(config)?;
        let collections = CollectionsApi::new(&query, executor.clone());
        let login_url = api::login_url(&config.api_base_url);
        Ok(Self {
            query,
            executor,
            collections,
            login_url,
        })
    }

    /// The shared cache store.
    pub fn query(&self) -> &QueryClient {
        &self.query
    }

    /// The raw fetch executor, for endpoints without a typed binding.
    pub fn executor(&self) -> &FetchExecutor {
        &self.executor
    }

    pub fn collections(&self) -> &CollectionsApi {
        &self.collections
    }

    /// The external URL a "log in" action navigates to.
    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    /// Tear down the cache: drop all entries and subscriptions. Called when
    /// the session ends; the cache never survives a reload.
    pub fn teardown(&self) {
        self.query.clear();
    }
}
