//! # Engine Event Bus
//!
//! Coarse engine-wide notifications over `tokio::sync::broadcast`. The
//! per-id observable cells in [`crate::state`] are the primary read path;
//! the event bus exists for embedders that want a single subscription
//! covering all engine activity (status bars, diagnostics, logging
//! mirrors).
//!
//! Subscribers that fall behind receive `RecvError::Lagged(n)` and can
//! keep consuming; `RecvError::Closed` signals shutdown.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, EngineEvent, EntityEvent};
//!
//! let bus = EventBus::new(100);
//! let mut rx = bus.subscribe();
//! bus.emit(EngineEvent::Entity(EntityEvent::Refreshed {
//!     kind: "album".to_string(),
//!     id: "album-1".to_string(),
//! }))
//! .ok();
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Top-level event enum covering all engine activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum EngineEvent {
    /// Entity-cache activity
    Entity(EntityEvent),
    /// Saved-library activity
    Saved(SavedEvent),
    /// Order-reconciliation activity
    Reorder(ReorderEvent),
}

impl EngineEvent {
    /// Human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            EngineEvent::Entity(e) => e.description(),
            EngineEvent::Saved(e) => e.description(),
            EngineEvent::Reorder(e) => e.description(),
        }
    }
}

/// Events emitted by the entity repositories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum EntityEvent {
    /// A remote refresh completed and the cache was updated.
    Refreshed { kind: String, id: String },
    /// The entity is confirmed absent remotely.
    Missing { kind: String, id: String },
    /// A refresh failed; the cached value (if any) is untouched.
    RefreshFailed {
        kind: String,
        id: String,
        message: String,
    },
    /// A cached entity was explicitly invalidated.
    Invalidated { kind: String, id: String },
}

impl EntityEvent {
    fn description(&self) -> &str {
        match self {
            EntityEvent::Refreshed { .. } => "Entity refreshed from remote",
            EntityEvent::Missing { .. } => "Entity confirmed absent remotely",
            EntityEvent::RefreshFailed { .. } => "Entity refresh failed",
            EntityEvent::Invalidated { .. } => "Entity cache invalidated",
        }
    }
}

/// Events emitted by the saved-set repositories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SavedEvent {
    /// An optimistic toggle was confirmed by the remote.
    ToggleConfirmed {
        kind: String,
        id: String,
        saved: bool,
    },
    /// An optimistic toggle was rolled back after a remote failure.
    ToggleReverted {
        kind: String,
        id: String,
        message: String,
    },
    /// A full library resync replaced the membership set.
    LibraryRefreshed { kind: String, count: usize },
}

impl SavedEvent {
    fn description(&self) -> &str {
        match self {
            SavedEvent::ToggleConfirmed { .. } => "Saved toggle confirmed",
            SavedEvent::ToggleReverted { .. } => "Saved toggle reverted",
            SavedEvent::LibraryRefreshed { .. } => "Saved library refreshed",
        }
    }
}

/// Events emitted by the order reconciler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ReorderEvent {
    /// A reconciliation run started calculating operations.
    Started { collection_id: String },
    /// All operations applied and the remote order verified.
    Converged {
        collection_id: String,
        operations: usize,
    },
    /// The run ended without converging.
    Failed {
        collection_id: String,
        message: String,
    },
}

impl ReorderEvent {
    fn description(&self) -> &str {
        match self {
            ReorderEvent::Started { .. } => "Reorder reconciliation started",
            ReorderEvent::Converged { .. } => "Reorder reconciliation converged",
            ReorderEvent::Failed { .. } => "Reorder reconciliation failed",
        }
    }
}

/// Central broadcast channel for engine events.
///
/// Fully thread-safe; share across tasks with `Arc`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Create a bus whose subscribers may lag by up to `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    ///
    /// Returns the number of subscribers reached, or an error when there
    /// are none. Having no subscribers is not a fault; callers typically
    /// `.ok()` the result.
    pub fn emit(&self, event: EngineEvent) -> Result<usize, SendError<EngineEvent>> {
        self.sender.send(event)
    }

    /// Open an independent subscription starting at the current tail.
    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_all_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let event = EngineEvent::Saved(SavedEvent::LibraryRefreshed {
            kind: "album".into(),
            count: 12,
        });
        let reached = bus.emit(event.clone()).unwrap();
        assert_eq!(reached, 2);

        assert_eq!(rx1.recv().await.unwrap(), event);
        assert_eq!(rx2.recv().await.unwrap(), event);
    }

    #[test]
    fn emit_without_subscribers_is_an_error_not_a_panic() {
        let bus = EventBus::new(4);
        let result = bus.emit(EngineEvent::Reorder(ReorderEvent::Started {
            collection_id: "pl1".into(),
        }));
        assert!(result.is_err());
    }
}
