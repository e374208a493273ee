//! # Saved-Set Repository
//!
//! Membership of one user's saved library for one entity kind, with
//! optimistic toggles and full-library resync.
//!
//! ## Toggle protocol
//!
//! A toggle flips the local store and the published set immediately,
//! then pushes to the remote. Remote failure *or* cancellation reverts
//! the flip, so the local set never silently diverges from the remote.
//! Toggles are single-flighted per entity id; a user's repeated clicks
//! collapse into one remote call.
//!
//! ## Displayed set
//!
//! [`SavedSetRepository::displayed`] accumulates every id shown as saved
//! since the last resync. List screens render from it so an unsave does
//! not yank the row out from under the user mid-session; a resync
//! collapses it back to the confirmed set.

use crate::error::{Result, SyncError};
use crate::job::Job;
use crate::single_flight::SingleFlight;
use core_library::models::EntityKind;
use core_library::store::SavedSetStore;
use core_runtime::events::{EngineEvent, EventBus, SavedEvent};
use core_runtime::state::{ObservableState, StateCell};
use core_runtime::EngineConfig;
use remote_traits::LibraryGateway;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Published membership state for one (user, kind) library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedLibrary {
    pub ids: HashSet<String>,
    /// Epoch seconds of the last full resync, `None` before the first.
    pub library_updated: Option<i64>,
}

/// Saved-library membership for one user and one entity kind.
pub struct SavedSetRepository {
    user_id: String,
    kind: EntityKind,
    config: Arc<EngineConfig>,
    gateway: Arc<dyn LibraryGateway>,
    store: Arc<dyn SavedSetStore>,
    library: StateCell<SavedLibrary>,
    displayed: StateCell<HashSet<String>>,
    toggles: SingleFlight<String, bool>,
    refreshes: SingleFlight<(), usize>,
    events: EventBus,
}

impl SavedSetRepository {
    /// Open the repository, seeding the published cells from the store.
    pub async fn open(
        user_id: impl Into<String>,
        kind: EntityKind,
        config: Arc<EngineConfig>,
        gateway: Arc<dyn LibraryGateway>,
        store: Arc<dyn SavedSetStore>,
        events: EventBus,
    ) -> Result<Self> {
        let user_id = user_id.into();
        let record = store.load(&user_id, kind).await?;
        let library = SavedLibrary {
            ids: record.ids.clone(),
            library_updated: record.library_updated,
        };
        Ok(Self {
            user_id,
            kind,
            config,
            gateway,
            store,
            displayed: StateCell::new(record.ids),
            library: StateCell::new(library),
            toggles: SingleFlight::new(),
            refreshes: SingleFlight::new(),
            events,
        })
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Whether `id` is currently saved, per the local set.
    pub fn is_saved(&self, id: &str) -> bool {
        self.library.get().ids.contains(id)
    }

    /// Confirmed membership set plus staleness metadata.
    pub fn library(&self) -> ObservableState<SavedLibrary> {
        self.library.observe()
    }

    /// Superset of the confirmed set: every id shown as saved since the
    /// last resync. Collapses on [`Self::refresh_library`].
    pub fn displayed(&self) -> ObservableState<HashSet<String>> {
        self.displayed.observe()
    }

    /// Flip membership of `id`, optimistically.
    ///
    /// Cancelling the returned [`Job`] reverts the flip the same way a
    /// remote failure does.
    pub fn set_saved(self: &Arc<Self>, id: &str, saved: bool) -> Job {
        let repo = Arc::clone(self);
        let id = id.to_string();
        Job::spawn(move |token| async move { repo.toggle(id, saved, token).await })
    }

    /// Resync the whole membership set from the remote.
    ///
    /// With `invalidate` false the resync is skipped while the last one
    /// is still inside the kind's TTL; `invalidate` true always refetches.
    pub fn refresh_library(self: &Arc<Self>, invalidate: bool) -> Job {
        let repo = Arc::clone(self);
        Job::spawn(move |token| async move {
            repo.refresh(invalidate, token).await.map(|_| ())
        })
    }

    async fn toggle(&self, id: String, saved: bool, token: CancellationToken) -> Result<()> {
        if self.is_saved(&id) == saved {
            debug!(kind = %self.kind, id = %id, saved, "toggle is a no-op");
            return Ok(());
        }

        let key = id.clone();
        self.toggles
            .run(key, async {
                self.apply_toggle(&id, saved, &token).await?;
                Ok(saved)
            })
            .await
            .map(|_| ())
            .map_err(SyncError::from)
    }

    #[instrument(skip(self, token), fields(user = %self.user_id, kind = %self.kind))]
    async fn apply_toggle(&self, id: &str, saved: bool, token: &CancellationToken) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        // Optimistic flip: store first, then the published cells.
        self.store
            .set_membership(&self.user_id, self.kind, id, saved, now)
            .await?;
        self.flip_cells(id, saved, false);

        let ids = [id.to_string()];
        let push = self.gateway.push_saved(&ids, saved);
        let result = tokio::select! {
            _ = token.cancelled() => Err(SyncError::Cancelled),
            r = push => r.map_err(SyncError::from),
        };

        match result {
            Ok(()) => {
                self.events
                    .emit(EngineEvent::Saved(SavedEvent::ToggleConfirmed {
                        kind: self.kind.to_string(),
                        id: id.to_string(),
                        saved,
                    }))
                    .ok();
                Ok(())
            }
            Err(e) => {
                warn!(id = %id, saved, error = %e, "toggle push failed, reverting");
                self.flip_cells(id, !saved, true);
                self.store
                    .set_membership(&self.user_id, self.kind, id, !saved, now)
                    .await?;
                self.events
                    .emit(EngineEvent::Saved(SavedEvent::ToggleReverted {
                        kind: self.kind.to_string(),
                        id: id.to_string(),
                        message: e.to_string(),
                    }))
                    .ok();
                Err(e)
            }
        }
    }

    /// Flip the published cells. A plain unsave keeps the id in the
    /// displayed superset so the row stays on screen; reverting an
    /// optimistic save removes it, because it was never confirmed saved.
    fn flip_cells(&self, id: &str, saved: bool, revert: bool) {
        self.library.update(|lib| {
            if saved {
                lib.ids.insert(id.to_string());
            } else {
                lib.ids.remove(id);
            }
        });
        if saved {
            self.displayed.update(|set| {
                set.insert(id.to_string());
            });
        } else if revert {
            self.displayed.update(|set| {
                set.remove(id);
            });
        }
    }

    async fn refresh(&self, invalidate: bool, token: CancellationToken) -> Result<usize> {
        self.refreshes
            .run((), async {
                self.refresh_inner(invalidate, &token).await
            })
            .await
            .map_err(SyncError::from)
    }

    #[instrument(skip(self, token), fields(user = %self.user_id, kind = %self.kind))]
    async fn refresh_inner(&self, invalidate: bool, token: &CancellationToken) -> Result<usize> {
        let now = chrono::Utc::now().timestamp();
        let current = self.library.get();

        if !invalidate {
            if let Some(stamp) = current.library_updated {
                let ttl = self.config.ttl_for(self.kind.as_str()).as_secs() as i64;
                if now - stamp < ttl {
                    debug!("library still fresh, skipping resync");
                    return Ok(current.ids.len());
                }
            }
        }

        let mut ids = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = tokio::select! {
                _ = token.cancelled() => return Err(SyncError::Cancelled),
                p = self.gateway.fetch_library_page(cursor.as_deref()) => p?,
            };
            ids.extend(page.ids);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        let now = chrono::Utc::now().timestamp();
        self.store
            .replace_all(&self.user_id, self.kind, &ids, now)
            .await?;

        let set: HashSet<String> = ids.into_iter().collect();
        let count = set.len();
        self.library.publish(SavedLibrary {
            ids: set.clone(),
            library_updated: Some(now),
        });
        // Collapse the displayed superset to the confirmed set.
        self.displayed.publish(set);

        info!(count, "library resynced");
        self.events
            .emit(EngineEvent::Saved(SavedEvent::LibraryRefreshed {
                kind: self.kind.to_string(),
                count,
            }))
            .ok();
        Ok(count)
    }
}
