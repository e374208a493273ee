//! Remote catalog gateway traits
//!
//! One gateway per concern: entity fetches, saved-library membership, and
//! ordered-collection mutation. Implementations wrap the provider's wire
//! protocol; the engine consumes them as `Arc<dyn ...>` trait objects.

use crate::error::RemoteResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Gateway for fetching one kind of entity from the remote catalog.
///
/// The payload type is whatever the provider deserializes off the wire;
/// conversion to a persisted record is the engine's job, not the gateway's.
#[async_trait]
pub trait EntityGateway: Send + Sync {
    type Payload: Send + 'static;

    /// Fetch a single entity by id.
    ///
    /// Returns [`crate::RemoteError::NotFound`] if the entity is confirmed
    /// absent remotely.
    async fn fetch(&self, id: &str) -> RemoteResult<Self::Payload>;

    /// Fetch several entities in one remote call.
    ///
    /// Ids absent remotely are simply missing from the result; the call as
    /// a whole only fails on transport-level problems. Implementations
    /// that cannot batch should return each payload from an internal
    /// per-id fetch and report `supports_batching() == false` so the
    /// engine issues concurrent single fetches instead.
    async fn fetch_batch(&self, ids: &[String]) -> RemoteResult<Vec<Self::Payload>>;

    /// Whether `fetch_batch` maps to a single remote call.
    fn supports_batching(&self) -> bool {
        true
    }
}

/// One page of a saved-library enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryPage {
    /// Entity ids saved in the user's library, in remote enumeration order.
    pub ids: Vec<String>,
    /// Cursor for the next page, or `None` when exhausted.
    pub next_cursor: Option<String>,
}

/// Gateway for the user's saved library of one entity kind.
#[async_trait]
pub trait LibraryGateway: Send + Sync {
    /// Fetch one page of the saved library.
    ///
    /// Pass `None` for the first page, then the returned cursor until it
    /// comes back `None`.
    async fn fetch_library_page(&self, cursor: Option<&str>) -> RemoteResult<LibraryPage>;

    /// Push a saved/unsaved membership change for the given ids.
    ///
    /// Idempotent remotely: saving an already-saved id is a no-op.
    async fn push_saved(&self, ids: &[String], saved: bool) -> RemoteResult<()>;
}

/// Opaque version stamp the remote service mutates on each collection
/// write. Every mutation must present the token returned by the previous
/// mutation; a stale token is rejected with
/// [`crate::RemoteError::TokenRejected`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyToken(pub String);

impl ConcurrencyToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One item of an ordered collection as the remote reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionItem {
    pub item_id: String,
    /// Dense zero-based position within the collection.
    pub position: usize,
}

/// A consistent read of a collection's order plus its concurrency token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub items: Vec<CollectionItem>,
    pub token: ConcurrencyToken,
}

impl CollectionSnapshot {
    /// Item ids in position order.
    pub fn ordered_ids(&self) -> Vec<String> {
        let mut items = self.items.clone();
        items.sort_by_key(|i| i.position);
        items.into_iter().map(|i| i.item_id).collect()
    }
}

/// A contiguous-range move, the remote service's native reorder primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRange {
    /// First index of the moved block in the collection's current order.
    pub range_start: usize,
    /// Number of items in the moved block.
    pub range_length: usize,
    /// Index the block is inserted before, expressed against the order
    /// *before* the block is lifted out.
    pub insert_before: usize,
}

/// Gateway for reading and mutating one user's ordered collections.
///
/// Mutations are not idempotent; replaying an `apply_move` against the
/// post-move order produces a different order. The token chain is the only
/// defense: each call consumes the previous call's token.
#[async_trait]
pub trait CollectionGateway: Send + Sync {
    /// Fetch the collection's current order and token.
    async fn fetch_order(&self, collection_id: &str) -> RemoteResult<CollectionSnapshot>;

    /// Move a contiguous range of items. Returns the new token.
    async fn apply_move(
        &self,
        collection_id: &str,
        op: MoveRange,
        token: &ConcurrencyToken,
    ) -> RemoteResult<ConcurrencyToken>;

    /// Insert an item at an index. Returns the new token.
    async fn apply_add(
        &self,
        collection_id: &str,
        item_id: &str,
        index: usize,
        token: &ConcurrencyToken,
    ) -> RemoteResult<ConcurrencyToken>;

    /// Remove the item at an index. Returns the new token.
    ///
    /// Removal is addressed by position, not id, because collections may
    /// legally contain duplicate item ids.
    async fn apply_remove(
        &self,
        collection_id: &str,
        index: usize,
        token: &ConcurrencyToken,
    ) -> RemoteResult<ConcurrencyToken>;
}
