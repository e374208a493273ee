//! # Single-Flight Guard
//!
//! Deduplicates concurrent operations keyed by an operation identity: at
//! most one unit of work runs per key, and every caller that arrives
//! while it is in flight observes the same outcome as the original
//! caller.
//!
//! The engine keys entity fetches by entity id, library resyncs by
//! (user, kind), and saved-toggles by entity id, so a user's repeated
//! clicks collapse into one remote call.
//!
//! ## Protocol
//!
//! [`SingleFlight::begin`] either hands out a [`FlightLease`] (this
//! caller is the leader and must complete the flight) or a
//! [`FlightFollower`] (someone else is flying; wait for their outcome).
//! Completion, failure, *and* leader cancellation all clear the key;
//! a dropped lease wakes followers with a cancelled outcome so they can
//! re-request if they still care. [`SingleFlight::run`] wraps the
//! protocol for the common inline case.

use crate::error::{SharedError, SyncError};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Shared outcome of one flight.
type Outcome<V> = Result<V, SharedError>;

enum FlightState<V> {
    Pending,
    Done(Outcome<V>),
}

/// Deduplicating guard over keyed units of work.
pub struct SingleFlight<K, V> {
    inflight: Mutex<HashMap<K, watch::Receiver<FlightState<V>>>>,
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Join or start the flight for `key`.
    pub fn begin(&self, key: K) -> Flight<'_, K, V> {
        let mut map = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(rx) = map.get(&key) {
            return Flight::Follower(FlightFollower { rx: rx.clone() });
        }

        let (tx, rx) = watch::channel(FlightState::Pending);
        map.insert(key.clone(), rx);
        Flight::Leader(FlightLease {
            owner: self,
            key: Some(key),
            tx: Some(tx),
        })
    }

    /// Run `work` under the guard for `key`.
    ///
    /// The leader executes `work` inline; followers never poll their copy
    /// of `work` and instead await the leader's outcome. Dropping the
    /// returned future while leading cancels the flight for everyone.
    pub async fn run<F>(&self, key: K, work: F) -> Outcome<V>
    where
        F: Future<Output = Result<V, SyncError>>,
    {
        match self.begin(key) {
            Flight::Leader(lease) => {
                let outcome = work.await.map_err(Arc::new);
                lease.complete(outcome.clone());
                outcome
            }
            Flight::Follower(follower) => follower.wait().await,
        }
    }

    /// Whether a flight is currently in progress for `key`.
    pub fn in_flight(&self, key: &K) -> bool {
        let map = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        map.contains_key(key)
    }

    fn clear(&self, key: &K) {
        let mut map = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(key);
    }
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Either side of a flight.
pub enum Flight<'a, K: Eq + Hash + Clone, V: Clone> {
    Leader(FlightLease<'a, K, V>),
    Follower(FlightFollower<V>),
}

/// Leader's obligation to finish the flight.
///
/// Dropping the lease without calling [`FlightLease::complete`] counts
/// as cancellation: the key is cleared and followers observe
/// [`SyncError::Cancelled`].
pub struct FlightLease<'a, K: Eq + Hash + Clone, V: Clone> {
    owner: &'a SingleFlight<K, V>,
    key: Option<K>,
    tx: Option<watch::Sender<FlightState<V>>>,
}

impl<K: Eq + Hash + Clone, V: Clone> FlightLease<'_, K, V> {
    /// Publish the outcome to all followers and clear the key.
    pub fn complete(mut self, outcome: Outcome<V>) {
        self.finish(outcome);
    }

    fn finish(&mut self, outcome: Outcome<V>) {
        if let (Some(key), Some(tx)) = (self.key.take(), self.tx.take()) {
            // Clear before publishing so a caller arriving after the
            // outcome starts a fresh flight instead of joining a dead one.
            self.owner.clear(&key);
            tx.send_replace(FlightState::Done(outcome));
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Drop for FlightLease<'_, K, V> {
    fn drop(&mut self) {
        self.finish(Err(Arc::new(SyncError::Cancelled)));
    }
}

/// Follower's handle onto an in-flight unit of work.
pub struct FlightFollower<V> {
    rx: watch::Receiver<FlightState<V>>,
}

impl<V: Clone> FlightFollower<V> {
    /// Await the leader's outcome.
    pub async fn wait(mut self) -> Outcome<V> {
        let state = self
            .rx
            .wait_for(|state| matches!(state, FlightState::Done(_)))
            .await;
        match state {
            Ok(state) => match &*state {
                FlightState::Done(outcome) => outcome.clone(),
                FlightState::Pending => unreachable!("wait_for only yields Done"),
            },
            // Sender vanished without publishing; treat as cancellation.
            Err(_) => Err(Arc::new(SyncError::Cancelled)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Barrier;

    #[tokio::test]
    async fn concurrent_callers_share_one_execution() {
        let flights: Arc<SingleFlight<String, u32>> = Arc::new(SingleFlight::new());
        let executions = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flights = Arc::clone(&flights);
            let executions = Arc::clone(&executions);
            let barrier = Arc::clone(&barrier);
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                flights
                    .run("key".to_string(), async {
                        executions.fetch_add(1, Ordering::SeqCst);
                        // Hold the flight open long enough for followers to pile in.
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok(42u32)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 42);
        }
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn completion_clears_the_key() {
        let flights: SingleFlight<&'static str, u32> = SingleFlight::new();
        flights.run("k", async { Ok(1) }).await.unwrap();
        assert!(!flights.in_flight(&"k"));

        // A later caller starts a fresh execution.
        let value = flights.run("k", async { Ok(2) }).await.unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn followers_observe_the_leader_failure() {
        let flights: Arc<SingleFlight<&'static str, u32>> = Arc::new(SingleFlight::new());

        let leader = {
            let flights = Arc::clone(&flights);
            tokio::spawn(async move {
                flights
                    .run("k", async {
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Err(SyncError::Conflict {
                            collection_id: "pl".into(),
                            reason: "diverged".into(),
                        })
                    })
                    .await
            })
        };
        // Let the leader claim the key before following.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let follower = flights.run("k", async { Ok(99) }).await;
        assert!(matches!(
            follower.unwrap_err().as_ref(),
            SyncError::Conflict { .. }
        ));
        assert!(leader.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn dropped_leader_wakes_followers_with_cancellation() {
        let flights: Arc<SingleFlight<&'static str, u32>> = Arc::new(SingleFlight::new());

        let lease = match flights.begin("k") {
            Flight::Leader(lease) => lease,
            Flight::Follower(_) => panic!("first caller must lead"),
        };
        let follower = match flights.begin("k") {
            Flight::Follower(follower) => follower,
            Flight::Leader(_) => panic!("second caller must follow"),
        };

        drop(lease);
        let outcome = follower.wait().await;
        assert!(outcome.unwrap_err().is_cancelled());
        assert!(!flights.in_flight(&"k"));
    }

    #[tokio::test]
    async fn distinct_keys_fly_independently() {
        let flights: SingleFlight<&'static str, u32> = SingleFlight::new();
        let a = flights.run("a", async { Ok(1) });
        let b = flights.run("b", async { Ok(2) });
        let (a, b) = tokio::join!(a, b);
        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 2);
    }
}
