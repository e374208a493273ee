//! # Entity Repository
//!
//! Generic cache-aside pipeline backing every entity kind. A repository
//! reads from the local store when fresh, otherwise fetches from the
//! remote gateway, converts, persists inside a transaction, and
//! republishes the per-id observable slot.
//!
//! ## Pipeline
//!
//! acquire single-flight guard for the id → check the local cache →
//! serve cached when fresh per the [`CacheStrategy`] → else fetch remote
//! → persist the converted record, stamping `updated_at` (and
//! `full_updated_at` for full payloads) → publish to the state hub.
//!
//! A failed refresh leaves the previous cached value untouched and
//! surfaces the error on the slot; stale-but-present data beats no data.
//! Nothing here retries automatically; retry policy belongs to callers.

use crate::error::{Result, SharedError, SyncError};
use crate::job::Job;
use crate::single_flight::{Flight, SingleFlight};
use core_library::models::EntityKind;
use core_library::store::{CachedRecord, EntityCacheStore};
use core_library::LibraryError;
use core_runtime::events::{EngineEvent, EntityEvent, EventBus};
use core_runtime::state::{ObservableState, StateHub};
use core_runtime::EngineConfig;
use remote_traits::EntityGateway;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Freshness policy attached to a read request.
///
/// The policy alone determines whether a remote fetch is triggered; it
/// never depends on caller identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStrategy {
    /// Fetch if absent, or if the last *full* refresh is older than the
    /// entity kind's configured TTL.
    Default,
    /// Custom freshness window judged against any refresh depth; used
    /// when only partial fields are needed.
    EntityTtl(Duration),
    /// Always fetch, regardless of cache freshness.
    AlwaysRefresh,
    /// Never fetch; serve whatever the cache holds.
    CacheOnly,
}

/// Published state of one entity id.
#[derive(Debug, Clone)]
pub enum EntitySlot<V> {
    /// Nothing known yet.
    Unloaded,
    /// A refresh is in flight; `previous` is the last good value, if any.
    Loading { previous: Option<V> },
    /// Converted view of the cached record.
    Ready(V),
    /// Confirmed absent remotely. Terminal until invalidated.
    Absent,
    /// The last refresh failed; `previous` is still the last good value.
    Failed {
        previous: Option<V>,
        error: SharedError,
    },
}

impl<V> EntitySlot<V> {
    /// The usable value, regardless of load phase.
    pub fn value(&self) -> Option<&V> {
        match self {
            EntitySlot::Ready(v) => Some(v),
            EntitySlot::Loading { previous } | EntitySlot::Failed { previous, .. } => {
                previous.as_ref()
            }
            EntitySlot::Unloaded | EntitySlot::Absent => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, EntitySlot::Loading { .. })
    }
}

impl<V> Default for EntitySlot<V> {
    fn default() -> Self {
        EntitySlot::Unloaded
    }
}

/// Compile-time description of one entity kind: its wire payload, its
/// persisted record, its published view, and the pure conversions
/// between them. No I/O.
pub trait EntityDef: Send + Sync + 'static {
    const KIND: EntityKind;

    type Payload: Send + Sync + 'static;
    type Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;
    type View: Clone + Send + Sync + 'static;

    fn payload_id(payload: &Self::Payload) -> &str;

    /// Whether the payload populates every field a full record carries.
    fn payload_is_full(payload: &Self::Payload) -> bool;

    /// Build the persisted record. `previous` is the record a prior
    /// refresh stored, if any; a partial payload merges over it instead
    /// of dropping the fields only a full fetch populates.
    fn record_from_payload(payload: Self::Payload, previous: Option<Self::Record>) -> Self::Record;

    fn view_of_record(record: &Self::Record) -> Self::View;
}

/// Cache-aside repository for one entity kind.
///
/// Explicitly constructed and dependency-injected; owns its state hub
/// and single-flight guard, borrows the store and gateway as shared
/// trait objects.
pub struct EntityRepository<D: EntityDef> {
    config: Arc<EngineConfig>,
    gateway: Arc<dyn EntityGateway<Payload = D::Payload>>,
    cache: Arc<dyn EntityCacheStore>,
    hub: StateHub<String, EntitySlot<D::View>>,
    flights: SingleFlight<String, EntitySlot<D::View>>,
    events: EventBus,
}

impl<D: EntityDef> EntityRepository<D> {
    pub fn new(
        config: Arc<EngineConfig>,
        gateway: Arc<dyn EntityGateway<Payload = D::Payload>>,
        cache: Arc<dyn EntityCacheStore>,
        events: EventBus,
    ) -> Self {
        Self {
            config,
            gateway,
            cache,
            hub: StateHub::new(),
            flights: SingleFlight::new(),
            events,
        }
    }

    pub fn kind(&self) -> EntityKind {
        D::KIND
    }

    /// Observable slot for `id`, refreshing in the background when the
    /// cache is absent or stale per `strategy`. Never blocks the caller.
    pub fn state_of(
        self: &Arc<Self>,
        id: &str,
        strategy: CacheStrategy,
    ) -> ObservableState<EntitySlot<D::View>> {
        let observable = self.hub.cell(&id.to_string()).observe();

        let repo = Arc::clone(self);
        let id = id.to_string();
        tokio::spawn(async move {
            if let Err(e) = repo.ensure_fresh(&id, strategy).await {
                debug!(kind = %D::KIND, id = %id, error = %e, "background refresh failed");
            }
        });

        observable
    }

    /// Batch form of [`Self::state_of`]. Ids needing a refresh are
    /// fetched with one batched remote call when the gateway supports
    /// batching, else concurrently.
    pub fn states_of(
        self: &Arc<Self>,
        ids: &[String],
        strategy: CacheStrategy,
    ) -> Vec<ObservableState<EntitySlot<D::View>>> {
        let observables = ids.iter().map(|id| self.hub.cell(id).observe()).collect();

        let repo = Arc::clone(self);
        let ids = ids.to_vec();
        tokio::spawn(async move {
            if let Err(e) = repo.ensure_fresh_batch(ids, strategy).await {
                debug!(kind = %D::KIND, error = %e, "background batch refresh failed");
            }
        });

        observables
    }

    /// Unconditionally fetch, convert, and persist, regardless of cache
    /// freshness. The caller may await or detach the returned [`Job`].
    pub fn refresh_from_remote(self: &Arc<Self>, id: &str) -> Job {
        let repo = Arc::clone(self);
        let id = id.to_string();
        Job::spawn(move |token| async move {
            tokio::select! {
                _ = token.cancelled() => {
                    repo.rollback_loading(&id);
                    Err(SyncError::Cancelled)
                }
                result = repo.guarded_refresh(&id, CacheStrategy::AlwaysRefresh) => {
                    result.map(|_| ()).map_err(SyncError::from)
                }
            }
        })
    }

    /// Drop the cached record and its observable cell.
    #[instrument(skip(self), fields(kind = %D::KIND))]
    pub async fn invalidate(&self, id: &str) -> Result<bool> {
        let removed = self.cache.invalidate(D::KIND, id).await?;
        self.hub.remove(&id.to_string());
        if removed {
            self.events
                .emit(EngineEvent::Entity(EntityEvent::Invalidated {
                    kind: D::KIND.to_string(),
                    id: id.to_string(),
                }))
                .ok();
        }
        Ok(removed)
    }

    async fn ensure_fresh(&self, id: &str, strategy: CacheStrategy) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let cached = self
            .cache
            .load(D::KIND, id)
            .await
            .map_err(|e| SyncError::Shared(self.fail_slot(id, e.into())))?;

        if let CacheStrategy::CacheOnly = strategy {
            if let Some(row) = cached {
                let slot = self.slot_from_row(&row)?;
                self.hub.publish(&id.to_string(), slot);
            }
            return Ok(());
        }

        if let Some(row) = &cached {
            if !self.needs_refresh(row, strategy, now) {
                let slot = self.slot_from_row(row)?;
                self.hub.publish(&id.to_string(), slot);
                return Ok(());
            }
        }

        self.guarded_refresh(id, strategy)
            .await
            .map(|_| ())
            .map_err(SyncError::from)
    }

    /// Refresh under the single-flight guard for `id`.
    async fn guarded_refresh(
        &self,
        id: &str,
        strategy: CacheStrategy,
    ) -> std::result::Result<EntitySlot<D::View>, SharedError> {
        self.flights
            .run(id.to_string(), self.refresh_inner(id, strategy))
            .await
    }

    async fn refresh_inner(&self, id: &str, strategy: CacheStrategy) -> Result<EntitySlot<D::View>> {
        let now = chrono::Utc::now().timestamp();

        let cached = self
            .cache
            .load(D::KIND, id)
            .await
            .map_err(|e| SyncError::Shared(self.fail_slot(id, e.into())))?;

        // Double-check inside the guard: the flight we queued behind may
        // have refreshed this id already.
        if strategy != CacheStrategy::AlwaysRefresh {
            if let Some(row) = &cached {
                if !self.needs_refresh(row, strategy, now) {
                    let slot = self
                        .slot_from_row(row)
                        .map_err(|e| SyncError::Shared(self.fail_slot(id, e)))?;
                    self.hub.publish(&id.to_string(), slot.clone());
                    return Ok(slot);
                }
            }
        }

        let previous = self.current_value(id);
        self.hub.publish(
            &id.to_string(),
            EntitySlot::Loading { previous },
        );

        match self.gateway.fetch(id).await {
            Ok(payload) => {
                let persisted = async {
                    let (stored_id, row, slot) = self.convert_payload(payload, cached.as_ref(), now)?;
                    self.cache.upsert(&row).await?;
                    Ok::<_, SyncError>((stored_id, slot))
                }
                .await;
                match persisted {
                    Ok((stored_id, slot)) => {
                        self.hub.publish(&stored_id, slot.clone());
                        self.events
                            .emit(EngineEvent::Entity(EntityEvent::Refreshed {
                                kind: D::KIND.to_string(),
                                id: stored_id,
                            }))
                            .ok();
                        Ok(slot)
                    }
                    Err(e) => Err(SyncError::Shared(self.fail_slot(id, e))),
                }
            }
            Err(e) if e.is_not_found() => {
                self.hub.publish(&id.to_string(), EntitySlot::Absent);
                self.events
                    .emit(EngineEvent::Entity(EntityEvent::Missing {
                        kind: D::KIND.to_string(),
                        id: id.to_string(),
                    }))
                    .ok();
                Ok(EntitySlot::Absent)
            }
            Err(e) => Err(SyncError::Shared(self.fail_slot(id, SyncError::Remote(e)))),
        }
    }

    async fn ensure_fresh_batch(
        self: &Arc<Self>,
        ids: Vec<String>,
        strategy: CacheStrategy,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let rows = self.cache.load_many(D::KIND, &ids).await.map_err(|e| {
            let shared = Arc::new(SyncError::from(e));
            for id in &ids {
                self.fail_slot_shared(id, Arc::clone(&shared));
            }
            SyncError::Shared(shared)
        })?;
        let by_id: HashMap<String, CachedRecord> =
            rows.into_iter().map(|row| (row.id.clone(), row)).collect();

        let mut needing = Vec::new();
        for id in &ids {
            match by_id.get(id) {
                Some(row)
                    if matches!(strategy, CacheStrategy::CacheOnly)
                        || !self.needs_refresh(row, strategy, now) =>
                {
                    let slot = self.slot_from_row(row)?;
                    self.hub.publish(id, slot);
                }
                Some(_) | None => {
                    if !matches!(strategy, CacheStrategy::CacheOnly) {
                        needing.push(id.clone());
                    }
                }
            }
        }

        if needing.is_empty() {
            return Ok(());
        }

        if self.gateway.supports_batching() {
            self.refresh_batch(needing, by_id, now).await
        } else {
            // No batched surface; issue the fetches concurrently, each
            // under its own guard.
            let refreshes = needing.iter().map(|id| self.guarded_refresh(id, strategy));
            for outcome in futures::future::join_all(refreshes).await {
                if let Err(e) = outcome {
                    // Per-id failures are already on the slots; keep going.
                    debug!(kind = %D::KIND, error = %e, "batch member refresh failed");
                }
            }
            Ok(())
        }
    }

    async fn refresh_batch(
        &self,
        ids: Vec<String>,
        prior: HashMap<String, CachedRecord>,
        now: i64,
    ) -> Result<()> {
        let mut leases = Vec::new();
        let mut leader_ids = Vec::new();
        for id in ids {
            match self.flights.begin(id.clone()) {
                Flight::Leader(lease) => {
                    leader_ids.push(id);
                    leases.push(lease);
                }
                // Another flight owns this id; its outcome reaches our
                // observers through the hub.
                Flight::Follower(_) => {}
            }
        }
        if leader_ids.is_empty() {
            return Ok(());
        }

        for id in &leader_ids {
            let previous = self.current_value(id);
            self.hub
                .publish(id, EntitySlot::Loading { previous });
        }

        let persisted = match self.gateway.fetch_batch(&leader_ids).await {
            Ok(payloads) => {
                async {
                    let mut converted: HashMap<String, (CachedRecord, EntitySlot<D::View>)> =
                        HashMap::new();
                    for payload in payloads {
                        let pid = D::payload_id(&payload).to_string();
                        let (id, row, slot) =
                            self.convert_payload(payload, prior.get(&pid), now)?;
                        converted.insert(id, (row, slot));
                    }

                    // One transaction for the whole batch: either every
                    // row lands or none does.
                    let rows: Vec<CachedRecord> =
                        converted.values().map(|(row, _)| row.clone()).collect();
                    self.cache.upsert_many(&rows).await?;
                    Ok::<_, SyncError>(converted)
                }
                .await
            }
            Err(e) => Err(SyncError::Remote(e)),
        };

        match persisted {
            Ok(mut converted) => {
                for (id, lease) in leader_ids.into_iter().zip(leases) {
                    match converted.remove(&id) {
                        Some((_, slot)) => {
                            self.hub.publish(&id, slot.clone());
                            self.events
                                .emit(EngineEvent::Entity(EntityEvent::Refreshed {
                                    kind: D::KIND.to_string(),
                                    id,
                                }))
                                .ok();
                            lease.complete(Ok(slot));
                        }
                        // Absent from the batch response means confirmed
                        // missing remotely.
                        None => {
                            self.hub.publish(&id, EntitySlot::Absent);
                            self.events
                                .emit(EngineEvent::Entity(EntityEvent::Missing {
                                    kind: D::KIND.to_string(),
                                    id,
                                }))
                                .ok();
                            lease.complete(Ok(EntitySlot::Absent));
                        }
                    }
                }
                Ok(())
            }
            Err(e) => {
                warn!(kind = %D::KIND, error = %e, "batched refresh failed");
                let shared = Arc::new(e);
                for (id, lease) in leader_ids.into_iter().zip(leases) {
                    self.fail_slot_shared(&id, Arc::clone(&shared));
                    lease.complete(Err(Arc::clone(&shared)));
                }
                Err(SyncError::Shared(shared))
            }
        }
    }

    /// Convert a payload into its cache row and published slot. A
    /// partial payload merges over the prior record, so the kept
    /// `full_updated_at` stamp still vouches for every full field.
    fn convert_payload(
        &self,
        payload: D::Payload,
        previous: Option<&CachedRecord>,
        now: i64,
    ) -> Result<(String, CachedRecord, EntitySlot<D::View>)> {
        let id = D::payload_id(&payload).to_string();
        let is_full = D::payload_is_full(&payload);
        let prior = match previous {
            Some(row) => {
                Some(serde_json::from_str::<D::Record>(&row.record).map_err(LibraryError::from)?)
            }
            None => None,
        };
        let record = D::record_from_payload(payload, prior);
        let row = CachedRecord {
            kind: D::KIND.as_str().to_string(),
            id: id.clone(),
            record: serde_json::to_string(&record).map_err(LibraryError::from)?,
            updated_at: now,
            full_updated_at: is_full.then_some(now),
        };
        let slot = EntitySlot::Ready(D::view_of_record(&record));
        Ok((id, row, slot))
    }

    fn slot_from_row(&self, row: &CachedRecord) -> Result<EntitySlot<D::View>> {
        let record: D::Record =
            serde_json::from_str(&row.record).map_err(LibraryError::from)?;
        Ok(EntitySlot::Ready(D::view_of_record(&record)))
    }

    fn needs_refresh(&self, row: &CachedRecord, strategy: CacheStrategy, now: i64) -> bool {
        match strategy {
            CacheStrategy::Default => {
                let ttl = self.config.ttl_for(D::KIND.as_str()).as_secs() as i64;
                row.is_stale(now, ttl, true)
            }
            CacheStrategy::EntityTtl(ttl) => row.is_stale(now, ttl.as_secs() as i64, false),
            CacheStrategy::AlwaysRefresh => true,
            CacheStrategy::CacheOnly => false,
        }
    }

    /// Publish a failed slot for `id`, keeping the last good value, and
    /// hand back the shared error for flight followers. Store errors
    /// route through here too, so observers are never stranded on
    /// `Loading`.
    fn fail_slot(&self, id: &str, error: SyncError) -> SharedError {
        self.fail_slot_shared(id, Arc::new(error))
    }

    fn fail_slot_shared(&self, id: &str, shared: SharedError) -> SharedError {
        warn!(kind = %D::KIND, id = %id, error = %shared, "entity refresh failed");
        self.hub.publish(
            &id.to_string(),
            EntitySlot::Failed {
                previous: self.current_value(id),
                error: Arc::clone(&shared),
            },
        );
        self.events
            .emit(EngineEvent::Entity(EntityEvent::RefreshFailed {
                kind: D::KIND.to_string(),
                id: id.to_string(),
                message: shared.to_string(),
            }))
            .ok();
        shared
    }

    fn current_value(&self, id: &str) -> Option<D::View> {
        self.hub
            .existing(&id.to_string())
            .and_then(|cell| cell.get().value().cloned())
    }

    /// Restore the pre-refresh slot after a cancelled refresh left a
    /// `Loading` marker behind.
    fn rollback_loading(&self, id: &str) {
        if let Some(cell) = self.hub.existing(&id.to_string()) {
            if let EntitySlot::Loading { previous } = cell.get() {
                cell.publish(match previous {
                    Some(v) => EntitySlot::Ready(v),
                    None => EntitySlot::Unloaded,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_value_survives_loading_and_failure() {
        let ready: EntitySlot<u32> = EntitySlot::Ready(7);
        assert_eq!(ready.value(), Some(&7));

        let loading: EntitySlot<u32> = EntitySlot::Loading { previous: Some(7) };
        assert_eq!(loading.value(), Some(&7));
        assert!(loading.is_loading());

        let failed: EntitySlot<u32> = EntitySlot::Failed {
            previous: Some(7),
            error: Arc::new(SyncError::Cancelled),
        };
        assert_eq!(failed.value(), Some(&7));

        let absent: EntitySlot<u32> = EntitySlot::Absent;
        assert_eq!(absent.value(), None);
    }

    #[test]
    fn default_slot_is_unloaded() {
        let slot: EntitySlot<u32> = EntitySlot::default();
        assert!(matches!(slot, EntitySlot::Unloaded));
    }
}
