//! Keyed queries
//!
//! A [`Query`] owns the fetch for one view: a committed [`QueryKey`], a
//! [`QueryCache`] of successful results keyed by serialized parameter
//! tuples, and the published [`QueryState`].
//!
//! ## Last-committed-wins
//!
//! Requests are never cancelled. When a response arrives for a key that is
//! no longer the committed one, the result is still cached under its own
//! key but is not published, so a slow response for superseded parameters
//! can never overwrite the state of newer ones.
//!
//! ```text
//! commit(k1) ── fetch(k1) ─────────────────────┐ (cached, discarded)
//!       commit(k2) ── fetch(k2) ──┐            │
//!                                 ▼            ▼
//! state:  Loading(k1) Loading(k2) Success(k2)  Success(k2)
//! ```

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{RwLock, watch};
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use crate::classify::{ClassifiedError, ErrorClassifier};
use crate::model::SearchParameters;
use crate::retry::{RetryPolicy, retry_with_backoff};

/// Serialized parameter tuple identifying one request
///
/// Keys are JSON arrays, e.g. `["apod","2024-01-01"]` or
/// `["marsRoverPhotos","curiosity",1000]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(String);

impl QueryKey {
    /// Build a key from any serializable parameter tuple
    pub fn new<P: Serialize>(params: &P) -> crate::Result<Self> {
        Ok(Self(serde_json::to_string(params)?))
    }

    /// Key for a daily image request (`None` = server default date)
    pub fn daily_image(date: Option<NaiveDate>) -> Self {
        let date = date
            .map(|d| Value::from(d.format(crate::validation::DATE_FORMAT).to_string()))
            .unwrap_or(Value::Null);
        Self(Value::Array(vec![Value::from("apod"), date]).to_string())
    }

    /// Key for a rover photo request
    pub fn rover_photos(params: &SearchParameters) -> Self {
        Self(
            Value::Array(vec![
                Value::from("marsRoverPhotos"),
                Value::from(params.rover.as_str()),
                Value::from(params.sol),
            ])
            .to_string(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Entries kept per cache unless configured otherwise
pub const DEFAULT_CACHE_CAPACITY: usize = 32;

#[derive(Debug)]
struct CacheEntry<T> {
    value: Arc<T>,
    /// Tick of the last insert or hit
    last_used: u64,
}

#[derive(Debug)]
struct CacheInner<T> {
    entries: HashMap<QueryKey, CacheEntry<T>>,
    tick: u64,
}

impl<T> CacheInner<T> {
    fn touch(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

/// Memoized successful results, keyed by [`QueryKey`]
///
/// Holds at most `capacity` entries; inserting past it evicts the least
/// recently used one. Nothing is persisted.
#[derive(Debug)]
pub struct QueryCache<T> {
    inner: Arc<RwLock<CacheInner<T>>>,
    capacity: usize,
}

impl<T> Clone for QueryCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            capacity: self.capacity,
        }
    }
}

impl<T> Default for QueryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> QueryCache<T> {
    /// Create a new empty cache with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create a new empty cache holding at most `capacity` entries (min 1)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner {
                entries: HashMap::new(),
                tick: 0,
            })),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up `key`, marking it as recently used
    pub async fn get(&self, key: &QueryKey) -> Option<Arc<T>> {
        let mut inner = self.inner.write().await;
        let tick = inner.touch();
        let entry = inner.entries.get_mut(key)?;
        entry.last_used = tick;
        Some(Arc::clone(&entry.value))
    }

    pub async fn insert(&self, key: QueryKey, value: Arc<T>) {
        let mut inner = self.inner.write().await;
        let last_used = inner.touch();
        inner.entries.insert(key, CacheEntry { value, last_used });

        while inner.entries.len() > self.capacity {
            let Some(oldest) = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            debug!("evicting {} from query cache", oldest);
            inner.entries.remove(&oldest);
        }
    }

    pub async fn contains(&self, key: &QueryKey) -> bool {
        self.inner.read().await.entries.contains_key(key)
    }

    /// Drop a single entry
    pub async fn invalidate(&self, key: &QueryKey) {
        self.inner.write().await.entries.remove(key);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    pub async fn clear(&self) {
        self.inner.write().await.entries.clear();
    }
}

/// Published state of a query
#[derive(Debug)]
pub enum QueryState<T> {
    /// Nothing requested yet
    Idle,
    /// Request in flight for `key`
    Loading { key: QueryKey },
    /// Data available for `key`
    Success { key: QueryKey, data: Arc<T> },
    /// Request for `key` failed
    Error { key: QueryKey, error: ClassifiedError },
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        match self {
            QueryState::Idle => QueryState::Idle,
            QueryState::Loading { key } => QueryState::Loading { key: key.clone() },
            QueryState::Success { key, data } => QueryState::Success {
                key: key.clone(),
                data: Arc::clone(data),
            },
            QueryState::Error { key, error } => QueryState::Error {
                key: key.clone(),
                error: error.clone(),
            },
        }
    }
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryState::Error { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, QueryState::Success { .. })
    }

    pub fn error(&self) -> Option<&ClassifiedError> {
        match self {
            QueryState::Error { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn data(&self) -> Option<&Arc<T>> {
        match self {
            QueryState::Success { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Key this state belongs to (`None` while idle)
    pub fn key(&self) -> Option<&QueryKey> {
        match self {
            QueryState::Idle => None,
            QueryState::Loading { key }
            | QueryState::Success { key, .. }
            | QueryState::Error { key, .. } => Some(key),
        }
    }
}

/// Keyed query with last-committed-wins publication
pub struct Query<T> {
    /// Name used in logs (e.g. "apod")
    name: &'static str,
    cache: QueryCache<T>,
    committed: Mutex<Option<QueryKey>>,
    state: watch::Sender<QueryState<T>>,
    classifier: ErrorClassifier,
    retry: Option<RetryPolicy>,
}

impl<T> std::fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("name", &self.name)
            .field("committed", &self.committed_key())
            .field("retry", &self.retry)
            .finish()
    }
}

impl<T: Send + Sync + 'static> Query<T> {
    /// Create an idle query
    pub fn new(name: &'static str, classifier: ErrorClassifier, retry: Option<RetryPolicy>) -> Self {
        let (state, _) = watch::channel(QueryState::Idle);
        Self {
            name,
            cache: QueryCache::new(),
            committed: Mutex::new(None),
            state,
            classifier,
            retry,
        }
    }

    /// Bound the result cache to `capacity` entries
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = QueryCache::with_capacity(capacity);
        self
    }

    /// Make `key` the committed key
    ///
    /// Returns `true` if the committed key changed.
    pub fn commit(&self, key: QueryKey) -> bool {
        let mut committed = self.lock_committed();
        if committed.as_ref() == Some(&key) {
            return false;
        }
        debug!("[{}] committed {}", self.name, key);
        *committed = Some(key);
        true
    }

    /// Current published state
    pub fn state(&self) -> QueryState<T> {
        self.state.borrow().clone()
    }

    /// Receiver for state changes
    pub fn receiver(&self) -> watch::Receiver<QueryState<T>> {
        self.state.subscribe()
    }

    /// Stream of state changes, starting with the current state
    pub fn subscribe(&self) -> WatchStream<QueryState<T>> {
        WatchStream::new(self.state.subscribe())
    }

    pub fn cache(&self) -> &QueryCache<T> {
        &self.cache
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Resolve `key`, from the cache unless `force` is set
    ///
    /// Returns the outcome for `key`. The outcome is only published if
    /// `key` is still the committed key when it arrives.
    pub async fn fetch<F, Fut>(&self, key: QueryKey, force: bool, fetcher: F) -> QueryState<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = crate::Result<T>>,
    {
        if !force && let Some(data) = self.cache.get(&key).await {
            debug!("[{}] cache hit for {}", self.name, key);
            let state = QueryState::Success { key: key.clone(), data };
            self.publish(&key, state.clone());
            return state;
        }

        self.publish(&key, QueryState::Loading { key: key.clone() });
        debug!("[{}] fetching {}", self.name, key);

        let result = match &self.retry {
            Some(policy) => retry_with_backoff(&fetcher, policy, &self.classifier).await,
            None => fetcher().await.map_err(|e| self.classifier.classify(&e)),
        };

        let state = match result {
            Ok(data) => {
                let data = Arc::new(data);
                self.cache.insert(key.clone(), Arc::clone(&data)).await;
                QueryState::Success {
                    key: key.clone(),
                    data,
                }
            }
            Err(error) => {
                error.log(self.name);
                QueryState::Error {
                    key: key.clone(),
                    error,
                }
            }
        };

        self.publish(&key, state.clone());
        state
    }

    /// Publish `state` if `key` is still committed
    fn publish(&self, key: &QueryKey, state: QueryState<T>) -> bool {
        let committed = self.lock_committed();
        if committed.as_ref() != Some(key) {
            debug!("[{}] discarding stale result for {}", self.name, key);
            return false;
        }
        self.state.send_replace(state);
        true
    }
}

impl<T> Query<T> {
    pub fn committed_key(&self) -> Option<QueryKey> {
        self.lock_committed().clone()
    }

    fn lock_committed(&self) -> MutexGuard<'_, Option<QueryKey>> {
        // The key is only ever replaced whole
        self.committed.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ErrorKind;
    use crate::error::Error;
    use crate::model::RoverName;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn query() -> Query<u32> {
        Query::new("test", ErrorClassifier::default(), None)
    }

    #[test]
    fn keys_are_serialized_tuples() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert_eq!(QueryKey::daily_image(date).as_str(), r#"["apod","2024-01-01"]"#);
        assert_eq!(QueryKey::daily_image(None).as_str(), r#"["apod",null]"#);

        let params = SearchParameters {
            sol: 42,
            rover: RoverName::Spirit,
        };
        assert_eq!(QueryKey::rover_photos(&params).as_str(), r#"["marsRoverPhotos","spirit",42]"#);
        assert_eq!(
            QueryKey::new(&("marsRoverPhotos", "spirit", 42)).unwrap(),
            QueryKey::rover_photos(&params)
        );
    }

    #[tokio::test]
    async fn cache_basic() {
        let cache: QueryCache<u32> = QueryCache::new();
        let key = QueryKey::daily_image(None);

        assert!(cache.is_empty().await);
        cache.insert(key.clone(), Arc::new(7)).await;
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&key).await.as_deref(), Some(&7));

        cache.invalidate(&key).await;
        assert!(!cache.contains(&key).await);
    }

    #[tokio::test]
    async fn cache_evicts_least_recently_used() {
        let cache: QueryCache<u32> = QueryCache::with_capacity(2);
        let key = |sol: u32| {
            QueryKey::rover_photos(&SearchParameters {
                sol,
                rover: RoverName::Curiosity,
            })
        };

        cache.insert(key(1), Arc::new(1)).await;
        cache.insert(key(2), Arc::new(2)).await;
        // Touch sol 1 so sol 2 becomes the eviction candidate
        assert!(cache.get(&key(1)).await.is_some());
        cache.insert(key(3), Arc::new(3)).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.contains(&key(1)).await);
        assert!(!cache.contains(&key(2)).await);
        assert!(cache.contains(&key(3)).await);
    }

    #[test]
    fn cache_capacity_is_at_least_one() {
        assert_eq!(QueryCache::<u32>::with_capacity(0).capacity(), 1);
        assert_eq!(QueryCache::<u32>::new().capacity(), DEFAULT_CACHE_CAPACITY);
    }

    #[tokio::test]
    async fn bounded_query_refetches_evicted_keys() {
        let query = query().with_cache_capacity(1);
        let calls = AtomicUsize::new(0);
        let first = QueryKey::daily_image(NaiveDate::from_ymd_opt(2000, 1, 1));
        let second = QueryKey::daily_image(NaiveDate::from_ymd_opt(2000, 1, 2));

        for key in [&first, &second, &first] {
            query.commit(key.clone());
            query
                .fetch(key.clone(), false, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(1)
                })
                .await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(query.cache().len().await, 1);
    }

    #[tokio::test]
    async fn second_fetch_hits_cache() {
        let query = query();
        let calls = AtomicUsize::new(0);
        let key = QueryKey::daily_image(None);
        query.commit(key.clone());

        for _ in 0..2 {
            let state = query
                .fetch(key.clone(), false, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(5)
                })
                .await;
            assert_eq!(state.data().map(|d| **d), Some(5));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        query
            .fetch(key.clone(), true, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(6)
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(query.state().data().map(|d| **d), Some(6));
    }

    #[tokio::test]
    async fn uncommitted_result_is_not_published() {
        let query = query();
        let committed = QueryKey::daily_image(None);
        let other = QueryKey::daily_image(NaiveDate::from_ymd_opt(2000, 1, 1));
        query.commit(committed);

        let outcome = query.fetch(other.clone(), false, || async { Ok(1) }).await;

        assert!(outcome.is_success());
        assert!(matches!(query.state(), QueryState::Idle));
        assert!(query.cache().contains(&other).await);
    }

    #[tokio::test]
    async fn failures_are_classified_and_not_cached() {
        let query = query();
        let key = QueryKey::daily_image(None);
        query.commit(key.clone());

        let state = query
            .fetch(key.clone(), false, || async {
                Err::<u32, _>(Error::http_status(429, "Too Many Requests", "/x"))
            })
            .await;

        assert!(query.state().is_error());
        assert_eq!(state.error().map(|e| e.kind), Some(ErrorKind::RateLimit));
        assert!(query.cache().is_empty().await);
    }

    #[test]
    fn commit_reports_change() {
        let query = query();
        let key = QueryKey::daily_image(None);
        assert!(query.commit(key.clone()));
        assert!(!query.commit(key.clone()));
        assert_eq!(query.committed_key(), Some(key));
    }
}
