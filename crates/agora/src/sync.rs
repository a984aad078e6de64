//! Synchronization primitives.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

/// Per-key single flight.
///
/// The first caller to [`join`](SingleFlight::join) a key becomes its
/// leader and does the work; callers that join while the leader is running
/// become followers and receive the leader's outcome, success or failure.
/// The key is free again as soon as the leader completes or is dropped.
///
/// ```ignore
/// let flights: SingleFlight<QueryKey, Result<Vec<Post>, ClientError>> = SingleFlight::new();
/// match flights.join(&QueryKey::posts()) {
///     Flight::Leader(leader) => leader.complete(fetch().await),
///     Flight::Follower(follower) => { let outcome = follower.wait().await; }
/// }
/// ```
pub struct SingleFlight<K, T> {
    flights: Arc<DashMap<K, Arc<watch::Sender<Option<T>>>>>,
}

impl<K, T> Clone for SingleFlight<K, T> {
    fn clone(&self) -> Self {
        Self {
            flights: Arc::clone(&self.flights),
        }
    }
}

/// Role handed out by [`SingleFlight::join`].
pub enum Flight<K: Eq + Hash, T> {
    Leader(FlightLeader<K, T>),
    Follower(FlightFollower<T>),
}

/// Owns the flight for a key until it completes or is dropped.
pub struct FlightLeader<K: Eq + Hash, T> {
    flights: Arc<DashMap<K, Arc<watch::Sender<Option<T>>>>>,
    key: K,
    tx: Arc<watch::Sender<Option<T>>>,
}

/// Waits on another caller's flight.
pub struct FlightFollower<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<K: Eq + Hash + Clone, T> SingleFlight<K, T> {
    pub fn new() -> Self {
        Self {
            flights: Arc::new(DashMap::new()),
        }
    }

    /// Lead the flight for `key`, or follow the one already running.
    pub fn join(&self, key: &K) -> Flight<K, T> {
        match self.flights.entry(key.clone()) {
            Entry::Occupied(entry) => Flight::Follower(FlightFollower {
                rx: entry.get().subscribe(),
            }),
            Entry::Vacant(entry) => {
                let (tx, _) = watch::channel(None);
                let tx = Arc::new(tx);
                entry.insert(Arc::clone(&tx));
                Flight::Leader(FlightLeader {
                    flights: Arc::clone(&self.flights),
                    key: key.clone(),
                    tx,
                })
            }
        }
    }

    /// Number of keys with a flight running.
    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }
}

impl<K: Eq + Hash + Clone, T> Default for SingleFlight<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, T> FlightLeader<K, T> {
    /// Hand `outcome` to every follower attached so far and free the key.
    pub fn complete(self, outcome: T) {
        self.detach();
        self.tx.send_replace(Some(outcome));
    }

    fn detach(&self) {
        // A later leader may already own the key.
        self.flights
            .remove_if(&self.key, |_, tx| Arc::ptr_eq(tx, &self.tx));
    }
}

impl<K: Eq + Hash, T> Drop for FlightLeader<K, T> {
    fn drop(&mut self) {
        self.detach();
    }
}

impl<T: Clone> FlightFollower<T> {
    /// The leader's outcome, or `None` if the leader was dropped without
    /// completing.
    pub async fn wait(mut self) -> Option<T> {
        let outcome = self.rx.wait_for(Option::is_some).await.ok()?;
        (*outcome).clone()
    }
}
