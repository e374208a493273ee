//! Remote Catalog Service Abstractions
//!
//! Provides the trait boundary between the reconciliation engine and the
//! remote music-catalog service. The engine never talks HTTP directly;
//! a concrete provider crate implements these traits against its wire
//! protocol and hands them to the engine as trait objects.
//!
//! ## Traits
//!
//! - [`EntityGateway`] - single and batched entity fetches for one entity kind
//! - [`LibraryGateway`] - saved-library enumeration and membership pushes
//! - [`CollectionGateway`] - ordered-collection reads and mutation with
//!   concurrency-token chaining
//!
//! ## Error Contract
//!
//! Every call either returns a well-formed payload or a typed
//! [`RemoteError`]. Calls are not assumed idempotent unless documented on
//! the method. Rate-limit responses surface as
//! [`RemoteError::RateLimited`], which callers must treat as retryable.

pub mod catalog;
pub mod error;

pub use catalog::{
    CollectionGateway, CollectionItem, CollectionSnapshot, ConcurrencyToken, EntityGateway,
    LibraryGateway, LibraryPage, MoveRange,
};
pub use error::{RemoteError, RemoteResult};
