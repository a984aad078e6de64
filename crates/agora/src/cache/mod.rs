//! Keyed query cache with in-flight deduplication and prefix invalidation.
//!
//! Reads go through [`QueryCache::read`]: a fresh entry is served without
//! calling the fetcher, otherwise exactly one fetch per key runs at a time and
//! every concurrent reader of that key gets its outcome. Mutations mark entries
//! stale with [`QueryCache::invalidate`]; stale values stay visible through
//! [`QueryCache::peek`] until the refetch lands.

mod invalidation;
mod key;

pub use invalidation::Mutation;
pub use key::{KeySegment, QueryKey};

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, broadcast};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::sync::{Flight, SingleFlight};

/// Capacity of the cache event channel. Slow subscribers see `Lagged`.
const EVENT_CAPACITY: usize = 64;

// ============================================================================
// Public Types
// ============================================================================

/// Freshness of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Served without a network call.
    Fresh,
    /// Still readable; the next `read` refetches.
    Stale,
    /// Nothing cached for the key.
    Absent,
}

/// A cached value together with its freshness.
#[derive(Debug, Clone)]
pub struct Cached<V> {
    pub value: V,
    pub freshness: Freshness,
}

/// Notification sent to cache subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// A fetch stored a new value for the key.
    Updated(QueryKey),
    /// The key's value was marked stale; live views should refetch.
    Invalidated(QueryKey),
}

// ============================================================================
// Query Cache
// ============================================================================

struct Slot<V> {
    value: Option<V>,
    fetched_at: Option<Instant>,
    stale: bool,
    /// Bumped by every invalidation. A fetch that started under an older
    /// generation stores its value as stale.
    generation: u64,
}

impl<V> Slot<V> {
    fn empty() -> Self {
        Self {
            value: None,
            fetched_at: None,
            stale: false,
            generation: 0,
        }
    }
}

/// Shared query cache holding `V`s fetched by fetchers that fail with `E`.
/// Cloning shares the underlying entries.
pub struct QueryCache<V, E> {
    slots: Arc<RwLock<HashMap<QueryKey, Slot<V>>>>,
    inflight: SingleFlight<QueryKey, Result<V, E>>,
    events: broadcast::Sender<CacheEvent>,
    max_age: Option<Duration>,
}

impl<V, E> Clone for QueryCache<V, E> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
            inflight: self.inflight.clone(),
            events: self.events.clone(),
            max_age: self.max_age,
        }
    }
}

impl<V, E> std::fmt::Debug for QueryCache<V, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("max_age", &self.max_age)
            .field("inflight", &self.inflight.len())
            .finish_non_exhaustive()
    }
}

impl<V: Clone, E: Clone + Display> Default for QueryCache<V, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone, E: Clone + Display> QueryCache<V, E> {
    /// Create a cache whose entries stay fresh until invalidated.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
            inflight: SingleFlight::new(),
            events,
            max_age: None,
        }
    }

    /// Also treat entries older than `max_age` as stale.
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    /// Return the value for `key`, fetching it if it is not fresh.
    ///
    /// Concurrent reads of the same key share one fetch: readers that arrive
    /// while it runs receive its outcome, value or error. A failed fetch
    /// leaves any previous value in place. Dropping the returned future
    /// abandons the fetch without writing anything; readers waiting on it
    /// start a fetch of their own.
    pub async fn read<F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        loop {
            if let Some(value) = self.fresh_value(key).await {
                debug!(key = %key, "Cache hit");
                return Ok(value);
            }

            let leader = match self.inflight.join(key) {
                Flight::Leader(leader) => leader,
                Flight::Follower(follower) => match follower.wait().await {
                    Some(outcome) => {
                        debug!(key = %key, "Served by in-flight fetch");
                        return outcome;
                    }
                    None => continue,
                },
            };

            // A fetch may have landed between the fresh check and the join.
            if let Some(value) = self.fresh_value(key).await {
                leader.complete(Ok(value.clone()));
                return Ok(value);
            }

            let generation = self.begin_fetch(key).await;
            debug!(key = %key, "Cache miss, fetching");

            let outcome = fetcher().await;
            match &outcome {
                Ok(value) => self.complete_fetch(key, value.clone(), generation).await,
                Err(e) => {
                    warn!(key = %key, error = %e, "Fetch failed; keeping previous value");
                    self.abandon_fetch(key).await;
                }
            }
            leader.complete(outcome.clone());
            return outcome;
        }
    }

    /// Mark every entry whose key starts with `prefix` as stale.
    ///
    /// Values are kept so views can keep showing them. Returns the number of
    /// entries that held a value.
    pub async fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut invalidated = Vec::new();
        {
            let mut slots = self.slots.write().await;
            for (key, slot) in slots.iter_mut() {
                if !key.starts_with(prefix) {
                    continue;
                }
                slot.generation += 1;
                if slot.value.is_some() {
                    slot.stale = true;
                    invalidated.push(key.clone());
                }
            }
        }

        debug!(prefix = %prefix, count = invalidated.len(), "Invalidated cache entries");
        let count = invalidated.len();
        for key in invalidated {
            let _ = self.events.send(CacheEvent::Invalidated(key));
        }
        count
    }

    /// Current value and freshness for `key`, without fetching.
    pub async fn peek(&self, key: &QueryKey) -> Option<Cached<V>> {
        let slots = self.slots.read().await;
        let slot = slots.get(key)?;
        let value = slot.value.clone()?;
        Some(Cached {
            value,
            freshness: self.freshness_of(slot),
        })
    }

    /// Freshness of `key`.
    pub async fn freshness(&self, key: &QueryKey) -> Freshness {
        let slots = self.slots.read().await;
        slots
            .get(key)
            .map_or(Freshness::Absent, |slot| self.freshness_of(slot))
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.slots.write().await.clear();
    }

    /// Subscribe to cache events.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn freshness_of(&self, slot: &Slot<V>) -> Freshness {
        if slot.value.is_none() {
            return Freshness::Absent;
        }
        if slot.stale {
            return Freshness::Stale;
        }
        match (self.max_age, slot.fetched_at) {
            (Some(max_age), Some(fetched_at)) if fetched_at.elapsed() > max_age => {
                Freshness::Stale
            }
            _ => Freshness::Fresh,
        }
    }

    async fn fresh_value(&self, key: &QueryKey) -> Option<V> {
        let slots = self.slots.read().await;
        let slot = slots.get(key)?;
        match self.freshness_of(slot) {
            Freshness::Fresh => slot.value.clone(),
            Freshness::Stale | Freshness::Absent => None,
        }
    }

    async fn begin_fetch(&self, key: &QueryKey) -> u64 {
        let mut slots = self.slots.write().await;
        slots.entry(key.clone()).or_insert_with(Slot::empty).generation
    }

    /// Drop the placeholder a failed first fetch left behind.
    async fn abandon_fetch(&self, key: &QueryKey) {
        let mut slots = self.slots.write().await;
        if slots.get(key).is_some_and(|slot| slot.value.is_none()) {
            slots.remove(key);
        }
    }

    async fn complete_fetch(&self, key: &QueryKey, value: V, generation: u64) {
        {
            let mut slots = self.slots.write().await;
            let slot = slots.entry(key.clone()).or_insert_with(Slot::empty);
            slot.stale = slot.generation != generation;
            if slot.stale {
                debug!(key = %key, "Invalidated during fetch; storing as stale");
            }
            slot.value = Some(value);
            slot.fetched_at = Some(Instant::now());
        }
        let _ = self.events.send(CacheEvent::Updated(key.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type TestCache = QueryCache<Vec<u32>, String>;

    async fn ok_fetch(calls: &AtomicUsize, value: Vec<u32>) -> Result<Vec<u32>, String> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    #[tokio::test]
    async fn fresh_entry_is_served_without_fetching() {
        let cache = TestCache::new();
        let calls = AtomicUsize::new(0);
        let key = QueryKey::posts();

        let first = cache.read(&key, || ok_fetch(&calls, vec![1])).await.unwrap();
        let second = cache.read(&key, || ok_fetch(&calls, vec![2])).await.unwrap();

        assert_eq!(first, vec![1]);
        assert_eq!(second, vec![1]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.freshness(&key).await, Freshness::Fresh);
    }

    #[tokio::test]
    async fn invalidated_entry_keeps_value_and_refetches_on_read() {
        let cache = TestCache::new();
        let calls = AtomicUsize::new(0);
        let key = QueryKey::post_comments(7);

        cache.read(&key, || ok_fetch(&calls, vec![1])).await.unwrap();
        assert_eq!(cache.invalidate(&key).await, 1);

        let peeked = cache.peek(&key).await.unwrap();
        assert_eq!(peeked.value, vec![1]);
        assert_eq!(peeked.freshness, Freshness::Stale);

        let refetched = cache.read(&key, || ok_fetch(&calls, vec![])).await.unwrap();
        assert!(refetched.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.freshness(&key).await, Freshness::Fresh);
    }

    #[tokio::test]
    async fn invalidate_matches_by_prefix_only() {
        let cache = TestCache::new();
        let calls = AtomicUsize::new(0);

        for key in [QueryKey::post(7), QueryKey::post_comments(7), QueryKey::post(8)] {
            cache.read(&key, || ok_fetch(&calls, vec![1])).await.unwrap();
        }

        assert_eq!(cache.invalidate(&QueryKey::post(7)).await, 2);
        assert_eq!(cache.freshness(&QueryKey::post(7)).await, Freshness::Stale);
        assert_eq!(
            cache.freshness(&QueryKey::post_comments(7)).await,
            Freshness::Stale
        );
        assert_eq!(cache.freshness(&QueryKey::post(8)).await, Freshness::Fresh);
    }

    #[tokio::test]
    async fn concurrent_reads_share_one_fetch() {
        let cache = TestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::posts();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .read(&key, || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, String>(vec![42])
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), vec![42]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_value_and_other_keys() {
        let cache = TestCache::new();
        let calls = AtomicUsize::new(0);
        let posts = QueryKey::posts();
        let post = QueryKey::post(1);

        cache.read(&posts, || ok_fetch(&calls, vec![1, 2])).await.unwrap();
        cache.read(&post, || ok_fetch(&calls, vec![1])).await.unwrap();
        cache.invalidate(&posts).await;

        let err = cache
            .read(&posts, || async { Err::<Vec<u32>, _>("boom".to_string()) })
            .await
            .unwrap_err();
        assert_eq!(err, "boom");

        let peeked = cache.peek(&posts).await.unwrap();
        assert_eq!(peeked.value, vec![1, 2]);
        assert_eq!(peeked.freshness, Freshness::Stale);
        assert_eq!(cache.freshness(&post).await, Freshness::Fresh);
    }

    #[tokio::test]
    async fn failed_first_fetch_leaves_key_absent() {
        let cache = TestCache::new();
        let key = QueryKey::post(3);

        let result = cache
            .read(&key, || async { Err::<Vec<u32>, _>("down".to_string()) })
            .await;

        assert!(result.is_err());
        assert!(cache.peek(&key).await.is_none());
        assert_eq!(cache.freshness(&key).await, Freshness::Absent);
        assert!(cache.slots.read().await.is_empty());
        assert!(cache.inflight.is_empty());
    }

    #[tokio::test]
    async fn concurrent_failing_reads_share_one_fetch() {
        let cache = TestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::posts();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .read(&key, || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Err::<Vec<u32>, _>("down".to_string())
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap_err(), "down");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.inflight.is_empty());

        // The failure is not remembered: the next read fetches again.
        let value = cache
            .read(&key, || ok_fetch(&calls, vec![3]))
            .await
            .unwrap();
        assert_eq!(value, vec![3]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn waiting_reader_fetches_when_the_running_fetch_is_abandoned() {
        let cache = TestCache::new();
        let key = QueryKey::post(5);

        let abandoned = {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move {
                cache
                    .read(&key, || async {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        Ok::<_, String>(vec![1])
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let waiting = {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move {
                let calls = AtomicUsize::new(0);
                let value = cache.read(&key, || ok_fetch(&calls, vec![2])).await;
                (value, calls.load(Ordering::SeqCst))
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        abandoned.abort();

        let (value, calls) = waiting.await.unwrap();
        assert_eq!(value.unwrap(), vec![2]);
        assert_eq!(calls, 1);
        assert_eq!(cache.freshness(&key).await, Freshness::Fresh);
    }

    #[tokio::test]
    async fn invalidation_during_fetch_stores_value_as_stale() {
        let cache = TestCache::new();
        let key = QueryKey::posts();

        let reader = {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move {
                cache
                    .read(&key, || async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, String>(vec![1])
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.invalidate(&key).await;

        assert_eq!(reader.await.unwrap().unwrap(), vec![1]);
        assert_eq!(cache.freshness(&key).await, Freshness::Stale);
    }

    #[tokio::test]
    async fn dropped_read_writes_nothing() {
        let cache = TestCache::new();
        let key = QueryKey::post(9);

        let read = cache.read(&key, || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, String>(vec![1])
        });
        let timed_out = tokio::time::timeout(Duration::from_millis(10), read).await;
        assert!(timed_out.is_err());

        assert!(cache.peek(&key).await.is_none());

        // The abandoned fetch released the key.
        let calls = AtomicUsize::new(0);
        let value = cache.read(&key, || ok_fetch(&calls, vec![2])).await.unwrap();
        assert_eq!(value, vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_older_than_max_age_are_stale() {
        let cache = TestCache::new().with_max_age(Some(Duration::from_secs(60)));
        let calls = AtomicUsize::new(0);
        let key = QueryKey::posts();

        cache.read(&key, || ok_fetch(&calls, vec![1])).await.unwrap();
        assert_eq!(cache.freshness(&key).await, Freshness::Fresh);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.freshness(&key).await, Freshness::Stale);

        cache.read(&key, || ok_fetch(&calls, vec![2])).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn subscribers_receive_updates_and_invalidations() {
        let cache = TestCache::new();
        let mut events = cache.subscribe();
        let calls = AtomicUsize::new(0);
        let key = QueryKey::post_comments(7);

        cache.read(&key, || ok_fetch(&calls, vec![1])).await.unwrap();
        cache.invalidate(&QueryKey::post(7)).await;

        assert_eq!(events.recv().await.unwrap(), CacheEvent::Updated(key.clone()));
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Invalidated(key));
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let cache = TestCache::new();
        let calls = AtomicUsize::new(0);
        let key = QueryKey::posts();

        cache.read(&key, || ok_fetch(&calls, vec![1])).await.unwrap();
        cache.clear().await;

        assert_eq!(cache.freshness(&key).await, Freshness::Absent);
    }
}
