//! The process-wide query cache store.
//!
//! [`QueryClient`] owns every cache entry and is the only component allowed
//! to mutate them. It is explicitly constructed and passed by reference (it
//! is `Clone` over a shared `Arc`), created once at application start and
//! torn down with [`QueryClient::clear`].
//!
//! # Notification model
//!
//! All entry mutation happens under a single mutex; listener callbacks run
//! *outside* the lock, serialized through a pending queue. A listener that
//! itself triggers `set_result` (or any other notifying operation) queues
//! the second notification until the first completes, so notification
//! cycles cannot recurse.
//!
//! # Coalescing
//!
//! At most one fetch per key is in flight at any time. A second request for
//! a loading key attaches as a subscriber instead of issuing a duplicate
//! network call.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tracing::{debug, warn};

use corpora_core::FetchError;

use crate::descriptor::QueryKey;
use crate::entry::{QueryState, QueryStatus};
use crate::query::QueryFetcher;
use crate::retry::RetryPolicy;

/// Callback invoked with a fresh snapshot whenever an entry changes.
pub type Listener = Arc<dyn Fn(&QueryState) + Send + Sync>;

struct EntryRecord {
    state: QueryState,
    subscriber_count: usize,
    in_flight: bool,
    // Set when an invalidation lands while a fetch is running: that fetch
    // read the backend before the mutation, so its result must not be
    // served fresh.
    invalidated_in_flight: bool,
    fetcher: Option<Arc<dyn QueryFetcher>>,
    listeners: Vec<(u64, Listener)>,
}

impl EntryRecord {
    fn idle() -> Self {
        Self {
            state: QueryState::idle(),
            subscriber_count: 0,
            in_flight: false,
            invalidated_in_flight: false,
            fetcher: None,
            listeners: Vec::new(),
        }
    }
}

struct ClientState {
    entries: HashMap<QueryKey, EntryRecord>,
    next_listener_id: u64,
    notifying: bool,
    pending: VecDeque<QueryKey>,
}

struct Inner {
    state: Mutex<ClientState>,
    retry: RetryPolicy,
}

/// The cache store. Cheap to clone; all clones share one entry map.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl QueryClient {
    /// Create an empty store with the given retry policy for query fetches.
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(ClientState {
                    entries: HashMap::new(),
                    next_listener_id: 0,
                    notifying: false,
                    pending: VecDeque::new(),
                }),
                retry,
            }),
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.retry
    }

    // Entry updates are applied atomically under the lock, so a poisoned
    // mutex still guards a coherent map; recover rather than propagate.
    fn lock_state(&self) -> MutexGuard<'_, ClientState> {
        match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Synchronous snapshot lookup. No side effects.
    pub fn get(&self, key: &QueryKey) -> Option<QueryState> {
        self.lock_state().entries.get(key).map(|e| e.state.clone())
    }

    /// Number of active subscribers for a key. Diagnostic only.
    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.lock_state()
            .entries
            .get(key)
            .map(|e| e.subscriber_count)
            .unwrap_or(0)
    }

    /// Register interest in a key.
    ///
    /// Creates the entry (Idle) if this is the first subscription. The
    /// returned guard decrements the subscriber count when dropped, so
    /// release is guaranteed by scope.
    pub fn subscribe(&self, key: &QueryKey, listener: Listener) -> Subscription {
        let mut state = self.lock_state();
        let id = state.next_listener_id;
        state.next_listener_id += 1;
        let entry = state
            .entries
            .entry(key.clone())
            .or_insert_with(EntryRecord::idle);
        entry.subscriber_count += 1;
        entry.listeners.push((id, listener));
        drop(state);

        Subscription {
            client: self.clone(),
            key: key.clone(),
            listener_id: id,
        }
    }

    /// Subscribe and invoke the listener once with the current entry
    /// state, under the same lock acquisition as the registration, so no
    /// update can slip in between the snapshot and the listener becoming
    /// visible. The listener must not call back into the store.
    pub(crate) fn subscribe_seeded(&self, key: &QueryKey, listener: Listener) -> Subscription {
        let mut state = self.lock_state();
        let id = state.next_listener_id;
        state.next_listener_id += 1;
        let entry = state
            .entries
            .entry(key.clone())
            .or_insert_with(EntryRecord::idle);
        entry.subscriber_count += 1;
        listener(&entry.state);
        entry.listeners.push((id, listener));
        drop(state);

        Subscription {
            client: self.clone(),
            key: key.clone(),
            listener_id: id,
        }
    }

    fn unsubscribe(&self, key: &QueryKey, listener_id: u64) {
        let mut state = self.lock_state();
        if let Some(entry) = state.entries.get_mut(key) {
            entry.listeners.retain(|(id, _)| *id != listener_id);
            entry.subscriber_count = entry.subscriber_count.saturating_sub(1);
        }
    }

    /// Record a successful fetch result and notify subscribers.
    ///
    /// If an invalidation arrived while the fetch was in flight, the
    /// result is recorded but stays stale, and subscribed entries
    /// immediately refetch: the fetch read the backend before the
    /// mutation, so its data must never be served as fresh.
    pub fn set_result(&self, key: &QueryKey, data: Value) {
        let refetch = {
            let mut state = self.lock_state();
            let entry = state
                .entries
                .entry(key.clone())
                .or_insert_with(EntryRecord::idle);
            entry.state.data = Some(data);
            entry.state.status = QueryStatus::Success;
            entry.state.error = None;
            entry.state.stale = false;
            entry.state.updated_at = Some(chrono::Utc::now());
            entry.in_flight = false;
            if entry.invalidated_in_flight {
                entry.invalidated_in_flight = false;
                entry.state.stale = true;
                if entry.subscriber_count > 0 {
                    entry.fetcher.clone().map(|fetcher| {
                        entry.state.status = QueryStatus::Loading;
                        entry.in_flight = true;
                        fetcher
                    })
                } else {
                    None
                }
            } else {
                None
            }
        };
        debug!(key = %key, "query result cached");
        self.notify(key.clone());
        if let Some(fetcher) = refetch {
            debug!(key = %key, "result predates an invalidation, refetching");
            self.spawn_fetch(key.clone(), fetcher);
        }
    }

    /// Record a failed fetch and notify subscribers.
    ///
    /// Previously cached data is kept visible alongside the error
    /// (stale-while-error); it is flagged stale instead of being dropped.
    pub fn set_error(&self, key: &QueryKey, error: FetchError) {
        {
            let mut state = self.lock_state();
            let entry = state
                .entries
                .entry(key.clone())
                .or_insert_with(EntryRecord::idle);
            entry.state.status = QueryStatus::Error;
            entry.state.stale = entry.invalidated_in_flight || entry.state.data.is_some();
            entry.invalidated_in_flight = false;
            entry.state.error = Some(error);
            entry.in_flight = false;
        }
        self.notify(key.clone());
    }

    /// Mark matching entries stale.
    ///
    /// Entries with active subscribers transition to Loading and their
    /// registered fetcher is re-run. An entry whose fetch is already in
    /// flight is flagged instead: the completing result stays stale and
    /// triggers a follow-up fetch, since it predates the invalidation.
    /// Entries with no subscribers are flagged stale and revalidate lazily
    /// on the next subscription.
    pub fn mark_stale<P>(&self, predicate: P)
    where
        P: Fn(&QueryKey) -> bool,
    {
        let mut to_notify = Vec::new();
        let mut to_fetch = Vec::new();
        {
            let mut state = self.lock_state();
            for (key, entry) in state.entries.iter_mut() {
                if !predicate(key) {
                    continue;
                }
                entry.state.stale = true;
                if entry.subscriber_count == 0 {
                    continue;
                }
                if entry.in_flight {
                    // The running fetch read the backend before this
                    // invalidation; its result completes stale and
                    // subscribed entries refetch then.
                    entry.invalidated_in_flight = true;
                    continue;
                }
                if let Some(fetcher) = entry.fetcher.clone() {
                    entry.state.status = QueryStatus::Loading;
                    entry.in_flight = true;
                    to_notify.push(key.clone());
                    to_fetch.push((key.clone(), fetcher));
                } else {
                    warn!(key = %key, "stale entry has no registered fetcher");
                }
            }
        }
        for key in to_notify {
            self.notify(key);
        }
        for (key, fetcher) in to_fetch {
            self.spawn_fetch(key, fetcher);
        }
    }

    /// Remove matching entries that have no subscribers.
    ///
    /// Entries with active subscribers are left in place, and a Loading
    /// entry is never evicted even at zero subscribers (its in-flight fetch
    /// may still gain awaiters).
    pub fn evict<P>(&self, predicate: P)
    where
        P: Fn(&QueryKey) -> bool,
    {
        let mut state = self.lock_state();
        state.entries.retain(|key, entry| {
            entry.subscriber_count > 0
                || entry.state.status == QueryStatus::Loading
                || !predicate(key)
        });
    }

    /// Evict every zero-subscriber entry.
    pub fn sweep(&self) {
        self.evict(|_| true);
    }

    /// Tear down the store: drop all entries and listener registrations.
    pub fn clear(&self) {
        let mut state = self.lock_state();
        state.entries.clear();
        state.pending.clear();
    }

    /// Register (or replace) the fetcher for a key and start a fetch unless
    /// a fresh result already exists or one is in flight.
    pub(crate) fn ensure_fetch(&self, key: &QueryKey, fetcher: Arc<dyn QueryFetcher>) {
        let started = {
            let mut state = self.lock_state();
            let entry = state
                .entries
                .entry(key.clone())
                .or_insert_with(EntryRecord::idle);
            entry.fetcher = Some(fetcher.clone());
            if entry.in_flight || entry.state.is_fresh() {
                false
            } else {
                entry.state.status = QueryStatus::Loading;
                entry.in_flight = true;
                true
            }
        };
        if started {
            debug!(key = %key, "starting fetch");
            self.notify(key.clone());
            self.spawn_fetch(key.clone(), fetcher);
        } else {
            debug!(key = %key, "fetch coalesced or cache fresh");
        }
    }

    /// Force a refetch for a key, coalescing with any in-flight fetch.
    pub fn refetch(&self, key: &QueryKey) {
        let fetcher = {
            let mut state = self.lock_state();
            let Some(entry) = state.entries.get_mut(key) else {
                return;
            };
            if entry.in_flight {
                None
            } else if let Some(fetcher) = entry.fetcher.clone() {
                entry.state.status = QueryStatus::Loading;
                entry.in_flight = true;
                Some(fetcher)
            } else {
                None
            }
        };
        if let Some(fetcher) = fetcher {
            self.notify(key.clone());
            self.spawn_fetch(key.clone(), fetcher);
        }
    }

    fn spawn_fetch(&self, key: QueryKey, fetcher: Arc<dyn QueryFetcher>) {
        let client = self.clone();
        tokio::spawn(async move {
            run_fetch(&client, &key, fetcher.as_ref()).await;
        });
    }

    /// Queue a notification for a key and drain the queue unless another
    /// notification pass is already running.
    fn notify(&self, key: QueryKey) {
        {
            let mut state = self.lock_state();
            state.pending.push_back(key);
            if state.notifying {
                return;
            }
            state.notifying = true;
        }
        loop {
            let next = {
                let mut state = self.lock_state();
                match state.pending.pop_front() {
                    Some(key) => {
                        let snapshot = state.entries.get(&key).map(|entry| {
                            (
                                entry.state.clone(),
                                entry
                                    .listeners
                                    .iter()
                                    .map(|(_, l)| l.clone())
                                    .collect::<Vec<_>>(),
                            )
                        });
                        Some(snapshot)
                    }
                    None => {
                        state.notifying = false;
                        None
                    }
                }
            };
            match next {
                Some(Some((snapshot, listeners))) => {
                    for listener in listeners {
                        listener(&snapshot);
                    }
                }
                Some(None) => {
                    // Entry evicted before its notification drained.
                }
                None => return,
            }
        }
    }
}

/// Run one fetch to completion, applying the client's bounded retry policy
/// to transport failures only.
async fn run_fetch(client: &QueryClient, key: &QueryKey, fetcher: &dyn QueryFetcher) {
    let policy = client.retry_policy().clone();
    let mut attempt: u32 = 0;
    loop {
        match fetcher.fetch().await {
            Ok(value) => {
                client.set_result(key, value);
                return;
            }
            Err(error) if error.is_retryable() && attempt + 1 < policy.max_attempts => {
                let backoff = policy.backoff_for(attempt);
                warn!(
                    key = %key,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    %error,
                    "transport failure, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(error) => {
                if matches!(error, FetchError::Decode { .. }) {
                    warn!(key = %key, %error, "response decode failed");
                }
                client.set_error(key, error);
                return;
            }
        }
    }
}

/// Guard returned by [`QueryClient::subscribe`]. Dropping it releases the
/// listener registration and decrements the subscriber count.
pub struct Subscription {
    client: QueryClient,
    key: QueryKey,
    listener_id: u64,
}

impl Subscription {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.client.unsubscribe(&self.key, self.listener_id);
    }
}
