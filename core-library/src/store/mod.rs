//! # Store Repositories
//!
//! Data access for the local mirror. Each store exposes a trait plus a
//! SQLite implementation over `sqlx`.
//!
//! ## Architecture
//!
//! - Traits define the interface; the engine holds them as trait objects
//! - All mutation runs inside explicit transactions (commit on `Ok`,
//!   rollback on error); a partially applied batch is never visible
//! - All operations return `Result<T>` with [`crate::LibraryError`]
//!
//! ## Available Stores
//!
//! - `EntityCacheStore` - converted entity records with freshness stamps
//! - `SavedSetStore` - saved-library membership per (user, kind)
//! - `CollectionStore` - locally edited ordered collections

pub mod collection;
pub mod entity_cache;
pub mod saved;

pub use collection::{CollectionStore, SqliteCollectionStore};
pub use entity_cache::{CachedRecord, EntityCacheStore, SqliteEntityCacheStore};
pub use saved::{SavedSetRecord, SavedSetStore, SqliteSavedSetStore};
