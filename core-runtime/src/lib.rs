//! # Runtime Services Module
//!
//! Provides runtime infrastructure for the Catalog Mirror Core:
//! engine configuration, structured logging bootstrap, the reactive state
//! hub, and the engine-wide event bus.
//!
//! ## Components
//!
//! - **Config** (`config`): builder-validated [`EngineConfig`] holding
//!   per-kind cache TTLs, paging, and reconciliation settings
//! - **Logging** (`logging`): `tracing-subscriber` initialization with
//!   env-filter and pretty/compact/JSON output
//! - **State Hub** (`state`): per-key observable value cells the
//!   repositories publish into and the UI layer observes
//! - **Events** (`events`): broadcast channel of coarse engine
//!   notifications for embedders that don't hold per-id observables

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod state;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use error::{Error, Result};
pub use events::{EngineEvent, EntityEvent, EventBus, ReorderEvent, SavedEvent};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use state::{ObservableState, StateCell, StateHub};
