//! In-memory query cache.
//!
//! Each [`QueryKey`] maps to one entry holding the last good value, the last
//! error, a stale flag and at most one in-flight fetch.
//!
//! # Fetching
//!
//! Concurrent reads of a key share one fetch through
//! [`futures::future::Shared`]. Every fetch is driven by a spawned completion
//! task, so dropping the caller's future does not cancel the request; the
//! result still lands in the cache.
//!
//! Fetches carry a sequence number. A completion is applied only while its
//! sequence is the entry's current in-flight sequence, so a response to an
//! older request never overwrites a newer one.
//!
//! # Invalidation
//!
//! [`QueryCache::invalidate`] marks entries stale and supersedes their
//! in-flight fetch. Entries with a live [`QueryObserver`] are refetched
//! immediately; the rest refetch on their next read.
//!
//! The state lock is a `std::sync::Mutex` and is never held across `.await`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::watch;
use tracing::debug;

use super::key::{CacheValue, QueryFamily, QueryKey};
use crate::error::ApiError;

type FetchResult = Result<CacheValue, ApiError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Produces a fresh fetch for a key each time it is called.
pub type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, FetchResult> + Send + Sync>;

/// Outcome of the most recent completed fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryStatus {
    /// Nothing has completed yet.
    #[default]
    Pending,
    Success,
    /// The last fetch failed. Earlier data, if any, is still available.
    Error,
}

/// What an observer sees of a cache entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySnapshot {
    pub data: Option<CacheValue>,
    pub error: Option<ApiError>,
    pub status: QueryStatus,
    pub is_fetching: bool,
    pub stale: bool,
}

struct InFlight {
    seq: u64,
    shared: SharedFetch,
}

struct Entry {
    value: Option<CacheValue>,
    error: Option<ApiError>,
    stale: bool,
    in_flight: Option<InFlight>,
    fetcher: Option<Fetcher>,
    updates: watch::Sender<QuerySnapshot>,
}

impl Entry {
    fn new() -> Self {
        let (updates, _) = watch::channel(QuerySnapshot::default());
        Self {
            value: None,
            error: None,
            stale: false,
            in_flight: None,
            fetcher: None,
            updates,
        }
    }

    fn snapshot(&self) -> QuerySnapshot {
        let status = if self.error.is_some() {
            QueryStatus::Error
        } else if self.value.is_some() {
            QueryStatus::Success
        } else {
            QueryStatus::Pending
        };
        QuerySnapshot {
            data: self.value.clone(),
            error: self.error.clone(),
            status,
            is_fetching: self.in_flight.is_some(),
            stale: self.stale,
        }
    }

    fn publish(&self) {
        self.updates.send_replace(self.snapshot());
    }

    fn is_observed(&self) -> bool {
        self.updates.receiver_count() > 0
    }

    fn needs_fetch(&self) -> bool {
        self.value.is_none() || self.stale
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, Entry>,
    next_seq: u64,
}

impl CacheState {
    fn allocate_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

/// Keyed result cache with fetch coalescing and declarative invalidation.
///
/// Cloning is cheap and clones share state.
#[derive(Clone, Default)]
pub struct QueryCache {
    inner: Arc<Mutex<CacheState>>,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.len())
            .finish()
    }
}

/// Non-owning handle to a [`QueryCache`], for fetchers that must reach back
/// into the cache that stores them.
#[derive(Clone, Default)]
pub struct WeakQueryCache {
    inner: Weak<Mutex<CacheState>>,
}

impl WeakQueryCache {
    /// The cache, if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<QueryCache> {
        self.inner.upgrade().map(|inner| QueryCache { inner })
    }
}

impl std::fmt::Debug for WeakQueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakQueryCache").finish_non_exhaustive()
    }
}

/// Box a closure into a [`Fetcher`].
pub fn fetcher<F, Fut>(f: F) -> Fetcher
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FetchResult> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

impl QueryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakQueryCache {
        WeakQueryCache {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read `key`, fetching through `fetcher` if there is no fresh value.
    ///
    /// Joins the in-flight fetch for `key` if there is one.
    ///
    /// # Errors
    ///
    /// Returns the fetch error. The entry keeps its previous value.
    pub async fn fetch(&self, key: QueryKey, fetcher: Fetcher) -> FetchResult {
        let pending = {
            let mut state = self.lock();
            let seq = state.next_seq + 1;
            let entry = state.entries.entry(key.clone()).or_insert_with(Entry::new);
            entry.fetcher = Some(Arc::clone(&fetcher));

            if !entry.needs_fetch()
                && let Some(value) = &entry.value
            {
                debug!(?key, "Cache hit");
                return Ok(value.clone());
            }

            if let Some(in_flight) = &entry.in_flight {
                debug!(?key, seq = in_flight.seq, "Joining in-flight fetch");
                in_flight.shared.clone()
            } else {
                debug!(?key, seq, "Cache miss");
                let shared = self.start(entry, key, seq, &fetcher);
                state.next_seq = seq;
                shared
            }
        };
        pending.await
    }

    /// Fetch `key` again even if its value is fresh, superseding any
    /// in-flight fetch.
    ///
    /// Returns `None` if no fetcher was ever registered for `key`.
    pub async fn refetch(&self, key: &QueryKey) -> Option<FetchResult> {
        let pending = {
            let mut state = self.lock();
            let seq = state.allocate_seq();
            let entry = state.entries.get_mut(key)?;
            let fetcher = entry.fetcher.clone()?;
            debug!(?key, seq, "Refetching");
            self.start(entry, key.clone(), seq, &fetcher)
        };
        Some(pending.await)
    }

    /// Start following `key`.
    ///
    /// Registers `fetcher` and starts a fetch unless a fresh value or an
    /// in-flight fetch already exists. While the observer is alive, the
    /// entry is refetched as soon as it is invalidated.
    #[must_use]
    pub fn observe(&self, key: QueryKey, fetcher: Fetcher) -> QueryObserver {
        let mut state = self.lock();
        let seq = state.next_seq + 1;
        let entry = state.entries.entry(key.clone()).or_insert_with(Entry::new);
        entry.fetcher = Some(Arc::clone(&fetcher));
        let receiver = entry.updates.subscribe();

        if entry.needs_fetch() && entry.in_flight.is_none() {
            debug!(?key, seq, "Observer mounted, fetching");
            drop(self.start(entry, key.clone(), seq, &fetcher));
            state.next_seq = seq;
        }

        QueryObserver {
            key,
            receiver,
            cache: self.clone(),
        }
    }

    /// Mark every entry of `families` stale.
    ///
    /// Observed entries are refetched right away. Must be called from within
    /// a tokio runtime.
    pub fn invalidate(&self, families: &[QueryFamily]) {
        let mut state = self.lock();
        let keys: Vec<QueryKey> = state
            .entries
            .keys()
            .filter(|key| families.contains(&key.family()))
            .cloned()
            .collect();

        for key in keys {
            let seq = state.allocate_seq();
            let Some(entry) = state.entries.get_mut(&key) else {
                continue;
            };
            entry.stale = true;
            if let Some(superseded) = entry.in_flight.take() {
                debug!(?key, seq = superseded.seq, "Superseding in-flight fetch");
            }

            match entry.fetcher.clone() {
                Some(fetcher) if entry.is_observed() => {
                    debug!(?key, seq, "Invalidated, refetching for observer");
                    drop(self.start(entry, key, seq, &fetcher));
                }
                _ => {
                    debug!(?key, "Invalidated");
                    entry.publish();
                }
            }
        }
    }

    /// Drop every cached value and cancel interest in in-flight fetches.
    ///
    /// Observed entries are kept, emptied, so their observers stay connected.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.retain(|_, entry| entry.is_observed());
        for entry in state.entries.values_mut() {
            entry.value = None;
            entry.error = None;
            entry.stale = false;
            entry.in_flight = None;
            entry.publish();
        }
        debug!(observed = state.entries.len(), "Cache cleared");
    }

    /// Current snapshot of `key`, if the cache has an entry for it.
    #[must_use]
    pub fn peek(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        self.lock().entries.get(key).map(Entry::snapshot)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Begin fetch `seq` for `entry`. The caller must hold the state lock
    /// and must have reserved `seq`.
    fn start(&self, entry: &mut Entry, key: QueryKey, seq: u64, fetcher: &Fetcher) -> SharedFetch {
        let shared = fetcher().shared();
        entry.in_flight = Some(InFlight {
            seq,
            shared: shared.clone(),
        });
        entry.publish();

        let completion = shared.clone();
        let cache = self.clone();
        tokio::spawn(async move {
            let result = completion.await;
            cache.complete(&key, seq, result);
        });

        shared
    }

    fn complete(&self, key: &QueryKey, seq: u64, result: FetchResult) {
        let mut state = self.lock();
        let Some(entry) = state.entries.get_mut(key) else {
            debug!(?key, seq, "Discarding result for cleared entry");
            return;
        };
        if entry.in_flight.as_ref().map(|f| f.seq) != Some(seq) {
            debug!(?key, seq, "Discarding superseded result");
            return;
        }

        entry.in_flight = None;
        match result {
            Ok(value) => {
                entry.value = Some(value);
                entry.error = None;
                entry.stale = false;
            }
            Err(error) => {
                debug!(?key, seq, %error, "Fetch failed, keeping previous value");
                entry.error = Some(error);
            }
        }
        entry.publish();
    }
}

/// A live subscription to one cache entry, the equivalent of a mounted view.
///
/// Dropping the observer unsubscribes; results of fetches still in flight
/// are cached but no longer delivered to it.
pub struct QueryObserver {
    key: QueryKey,
    receiver: watch::Receiver<QuerySnapshot>,
    cache: QueryCache,
}

impl std::fmt::Debug for QueryObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryObserver")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl QueryObserver {
    #[must_use]
    pub const fn key(&self) -> &QueryKey {
        &self.key
    }

    /// The latest snapshot.
    #[must_use]
    pub fn snapshot(&self) -> QuerySnapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. Returns `None` once the entry is gone.
    pub async fn changed(&mut self) -> Option<QuerySnapshot> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Wait until no fetch is in flight and return that snapshot.
    pub async fn settled(&mut self) -> Option<QuerySnapshot> {
        self.receiver
            .wait_for(|snapshot| !snapshot.is_fetching)
            .await
            .ok()
            .map(|snapshot| snapshot.clone())
    }

    /// Fetch the entry again.
    pub async fn refetch(&self) -> Option<FetchResult> {
        self.cache.refetch(&self.key).await
    }
}
