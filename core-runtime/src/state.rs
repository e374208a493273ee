//! # Reactive State Hub
//!
//! The observable-state primitive the repositories publish into and the
//! UI layer observes. Each logical key (an entity id, a saved-library
//! identity, a reconciliation run) owns a [`StateCell`], a value cell
//! backed by `tokio::sync::watch`. Observers hold an [`ObservableState`]
//! handle and await changes; publishers replace the value.
//!
//! ## Guarantees
//!
//! - Per-cell publishes are observed in publish order; there is no
//!   ordering guarantee across cells.
//! - Observers may see the same value more than once (a slow observer
//!   that misses intermediate values sees only the latest); consumption
//!   must be idempotent.
//! - Publishing never blocks and never fails, even with zero observers.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::state::StateCell;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cell = StateCell::new(0u32);
//! let mut obs = cell.observe();
//! cell.publish(1);
//! obs.changed().await;
//! assert_eq!(obs.get(), 1);
//! # }
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// A single observable value cell.
///
/// Cloneable handles share the same underlying channel; the last
/// published value is always retained for late subscribers.
#[derive(Debug)]
pub struct StateCell<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone + Send + Sync + 'static> StateCell<T> {
    /// Create a cell holding `initial`.
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Replace the current value and notify all observers.
    pub fn publish(&self, value: T) {
        // send_replace succeeds even when no observer is subscribed.
        self.tx.send_replace(value);
    }

    /// Mutate the current value in place and notify all observers.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        self.tx.send_modify(f);
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Subscribe; the handle immediately sees the current value.
    pub fn observe(&self) -> ObservableState<T> {
        ObservableState {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live observer handles.
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Observer handle onto a [`StateCell`].
#[derive(Debug, Clone)]
pub struct ObservableState<T> {
    rx: watch::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> ObservableState<T> {
    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait until a value newer than the last seen one is published.
    ///
    /// Returns `false` if the publishing side has been dropped; the cell
    /// will never change again.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait for the next published value and return it.
    pub async fn next(&mut self) -> Option<T> {
        if self.rx.changed().await.is_err() {
            return None;
        }
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until the value satisfies `pred`, returning the matching value.
    ///
    /// The current value is tested first, so an already-satisfied
    /// predicate returns immediately.
    pub async fn wait_for<F>(&mut self, pred: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        self.rx.wait_for(pred).await.ok().map(|v| v.clone())
    }
}

/// Keyed registry of state cells with explicit lifecycle.
///
/// Owned by a repository instance; cells are created on first use and
/// removed by explicit invalidation, not by observer count.
#[derive(Debug)]
pub struct StateHub<K, T> {
    cells: Mutex<HashMap<K, Arc<StateCell<T>>>>,
}

impl<K, T> StateHub<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Default + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the cell for `key`, creating it with `T::default()` if absent.
    pub fn cell(&self, key: &K) -> Arc<StateCell<T>> {
        let mut cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            cells
                .entry(key.clone())
                .or_insert_with(|| Arc::new(StateCell::new(T::default()))),
        )
    }

    /// Fetch the cell for `key` without creating it.
    pub fn existing(&self, key: &K) -> Option<Arc<StateCell<T>>> {
        let cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
        cells.get(key).cloned()
    }

    /// Publish `value` to the cell for `key`, creating the cell if needed.
    pub fn publish(&self, key: &K, value: T) {
        self.cell(key).publish(value);
    }

    /// Drop the cell for `key`. Live observers keep their last value but
    /// never see another change.
    pub fn remove(&self, key: &K) {
        let mut cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
        cells.remove(key);
    }

    /// Number of live cells.
    pub fn len(&self) -> usize {
        let cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
        cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, T> Default for StateHub<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn observer_sees_publishes_in_order() {
        let cell = StateCell::new(0u32);
        let mut obs = cell.observe();

        cell.publish(1);
        assert_eq!(obs.next().await, Some(1));
        cell.publish(2);
        assert_eq!(obs.next().await, Some(2));
    }

    #[tokio::test]
    async fn late_subscriber_sees_latest_value() {
        let cell = StateCell::new("a".to_string());
        cell.publish("b".to_string());

        let obs = cell.observe();
        assert_eq!(obs.get(), "b");
    }

    #[tokio::test]
    async fn wait_for_returns_immediately_when_satisfied() {
        let cell = StateCell::new(5u32);
        let mut obs = cell.observe();

        let got = tokio::time::timeout(Duration::from_secs(1), obs.wait_for(|v| *v == 5))
            .await
            .expect("wait_for should not block");
        assert_eq!(got, Some(5));
    }

    #[tokio::test]
    async fn hub_creates_cells_on_demand_and_removes_explicitly() {
        let hub: StateHub<String, u32> = StateHub::new();
        assert!(hub.is_empty());

        hub.publish(&"k1".to_string(), 7);
        assert_eq!(hub.cell(&"k1".to_string()).get(), 7);
        assert_eq!(hub.len(), 1);

        hub.remove(&"k1".to_string());
        assert!(hub.existing(&"k1".to_string()).is_none());
        // A fresh cell starts from the default again.
        assert_eq!(hub.cell(&"k1".to_string()).get(), 0);
    }

    #[tokio::test]
    async fn independent_cells_do_not_interfere() {
        let hub: StateHub<&'static str, u32> = StateHub::new();
        let mut a = hub.cell(&"a").observe();
        let mut b = hub.cell(&"b").observe();

        hub.publish(&"b", 2);
        hub.publish(&"a", 1);

        assert_eq!(a.next().await, Some(1));
        assert_eq!(b.next().await, Some(2));
    }
}
