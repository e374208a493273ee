//! # Engine Configuration Module
//!
//! Builder-validated configuration for the reconciliation engine. The
//! builder fails fast: invalid values surface as [`Error::Config`] at
//! construction time, not as surprises mid-sync.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::config::EngineConfig;
//! use std::time::Duration;
//!
//! let config = EngineConfig::builder()
//!     .default_ttl(Duration::from_secs(15 * 60))
//!     .kind_ttl("track", Duration::from_secs(60 * 60))
//!     .library_page_size(50)
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.ttl_for("track"), Duration::from_secs(3600));
//! assert_eq!(config.ttl_for("artist"), Duration::from_secs(900));
//! ```

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Predicate excluding items from ordered-collection reconciliation.
///
/// Returns `true` for item ids the reconciler must leave alone. The
/// default excludes nothing; accounts with provider-injected catalog
/// items they cannot reorder configure this instead of the engine
/// hard-coding name rules.
pub type ExclusionPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Engine-wide configuration.
#[derive(Clone)]
pub struct EngineConfig {
    default_ttl: Duration,
    kind_ttls: HashMap<String, Duration>,
    /// Page size used when enumerating the saved library.
    pub library_page_size: usize,
    /// Buffer size for the engine event bus.
    pub event_buffer_size: usize,
    /// Items excluded from reorder reconciliation.
    pub reorder_exclusion: ExclusionPredicate,
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Freshness window for the given entity kind.
    pub fn ttl_for(&self, kind: &str) -> Duration {
        self.kind_ttls.get(kind).copied().unwrap_or(self.default_ttl)
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("default_ttl", &self.default_ttl)
            .field("kind_ttls", &self.kind_ttls)
            .field("library_page_size", &self.library_page_size)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish_non_exhaustive()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfigBuilder::default()
            .build()
            .expect("default engine config is valid")
    }
}

/// Builder for [`EngineConfig`].
pub struct EngineConfigBuilder {
    default_ttl: Duration,
    kind_ttls: HashMap<String, Duration>,
    library_page_size: usize,
    event_buffer_size: usize,
    reorder_exclusion: ExclusionPredicate,
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(15 * 60),
            kind_ttls: HashMap::new(),
            library_page_size: 50,
            event_buffer_size: crate::events::DEFAULT_EVENT_BUFFER_SIZE,
            reorder_exclusion: Arc::new(|_| false),
        }
    }
}

impl EngineConfigBuilder {
    /// Freshness window applied to kinds without a specific override.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Freshness window for one entity kind.
    pub fn kind_ttl(mut self, kind: impl Into<String>, ttl: Duration) -> Self {
        self.kind_ttls.insert(kind.into(), ttl);
        self
    }

    /// Page size for saved-library enumeration.
    pub fn library_page_size(mut self, size: usize) -> Self {
        self.library_page_size = size;
        self
    }

    /// Buffer size for the engine event bus.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    /// Predicate excluding item ids from reorder reconciliation.
    pub fn reorder_exclusion<F>(mut self, pred: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.reorder_exclusion = Arc::new(pred);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a TTL is zero, the page size is
    /// zero, or the event buffer size is zero.
    pub fn build(self) -> Result<EngineConfig> {
        if self.default_ttl.is_zero() {
            return Err(Error::Config(
                "default_ttl must be greater than zero".to_string(),
            ));
        }
        if let Some((kind, _)) = self.kind_ttls.iter().find(|(_, ttl)| ttl.is_zero()) {
            return Err(Error::Config(format!(
                "ttl for kind '{}' must be greater than zero",
                kind
            )));
        }
        if self.library_page_size == 0 {
            return Err(Error::Config(
                "library_page_size must be greater than zero".to_string(),
            ));
        }
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "event_buffer_size must be greater than zero".to_string(),
            ));
        }

        Ok(EngineConfig {
            default_ttl: self.default_ttl,
            kind_ttls: self.kind_ttls,
            library_page_size: self.library_page_size,
            event_buffer_size: self.event_buffer_size,
            reorder_exclusion: self.reorder_exclusion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_ttl_overrides_default() {
        let config = EngineConfig::builder()
            .default_ttl(Duration::from_secs(600))
            .kind_ttl("playlist", Duration::from_secs(30))
            .build()
            .unwrap();

        assert_eq!(config.ttl_for("playlist"), Duration::from_secs(30));
        assert_eq!(config.ttl_for("album"), Duration::from_secs(600));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let result = EngineConfig::builder()
            .kind_ttl("track", Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let result = EngineConfig::builder().library_page_size(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn exclusion_predicate_is_consulted() {
        let config = EngineConfig::builder()
            .reorder_exclusion(|id| id.starts_with("local:"))
            .build()
            .unwrap();

        assert!((config.reorder_exclusion)("local:42"));
        assert!(!(config.reorder_exclusion)("track:42"));
    }
}
