//! # Synchronization Engine Module
//!
//! The engine that keeps the local catalog mirror converged with the
//! remote service: guarded cache-aside entity reads, optimistic
//! saved-library toggles, and ordered-collection reconciliation.
//!
//! ## Components
//!
//! - **Single-flight** (`single_flight`): per-key deduplication guard;
//!   concurrent requests for one id collapse into one remote call
//! - **Repository** (`repository`): generic cache-aside pipeline over
//!   the entity cache store, parameterized by [`EntityDef`]
//! - **Entities** (`entities`): the four catalog kinds wired into the
//!   generic repository
//! - **Saved** (`saved`): saved-library membership with optimistic
//!   toggle-and-revert and paged full resync
//! - **Reorder** (`reorder`): LIS-based planning plus token-chained
//!   serial apply for ordered collections
//! - **Jobs** (`job`): cancellable handles for engine background work
//!
//! ## Usage
//!
//! ```no_run
//! use core_sync::{CacheStrategy, TrackRepository};
//! # async fn example(tracks: std::sync::Arc<TrackRepository>) {
//! let mut state = tracks.state_of("track-1", CacheStrategy::Default);
//! while state.changed().await {
//!     // render state.get()
//! }
//! # }
//! ```

pub mod entities;
pub mod error;
pub mod job;
pub mod reorder;
pub mod repository;
pub mod saved;
pub mod single_flight;

pub use entities::{
    AlbumDef, AlbumRepository, ArtistDef, ArtistRepository, PlaylistDef, PlaylistRepository,
    TrackDef, TrackRepository,
};
pub use error::{Result, SharedError, SyncError};
pub use job::{Job, JobId};
pub use reorder::{plan_reorder, OrderReconciler, ReorderOp, ReorderProgress};
pub use repository::{CacheStrategy, EntityDef, EntityRepository, EntitySlot};
pub use saved::{SavedLibrary, SavedSetRepository};
pub use single_flight::{Flight, FlightFollower, FlightLease, SingleFlight};
