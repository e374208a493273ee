//! # Local Catalog Cache Module
//!
//! Owns the local relational mirror of the remote catalog and provides
//! store repositories for data access.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite connection pooling and embedded migrations
//! - The generic entity cache (converted records plus freshness stamps)
//! - Saved-library membership sets
//! - Locally edited collection orders
//!
//! All mutation happens inside explicit `sqlx` transactions: commit on
//! normal return, rollback on error. A partially applied batch is never
//! visible to other readers.

pub mod db;
pub mod error;
pub mod models;
pub mod store;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{LibraryError, Result};
pub use models::EntityKind;
