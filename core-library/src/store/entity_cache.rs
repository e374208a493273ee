//! Generic entity cache store
//!
//! One row per (kind, id): the converted record as JSON plus the two
//! freshness stamps. The cache schema is deliberately kind-agnostic; the
//! typed record shapes live in [`crate::models`] and the engine
//! serializes them through these rows.

use crate::error::Result;
use crate::models::EntityKind;
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};
use tracing::instrument;

/// A cached entity row.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CachedRecord {
    pub kind: String,
    pub id: String,
    /// Converted record serialized as JSON.
    pub record: String,
    /// Epoch seconds of the last refresh of any depth.
    pub updated_at: i64,
    /// Epoch seconds of the last refresh that populated all fields.
    pub full_updated_at: Option<i64>,
}

impl CachedRecord {
    /// Whether the record is older than `ttl_secs`, judged against `now`.
    ///
    /// `require_full` additionally demands a full refresh inside the
    /// window, used by callers that need every field populated.
    pub fn is_stale(&self, now: i64, ttl_secs: i64, require_full: bool) -> bool {
        if require_full {
            match self.full_updated_at {
                Some(full) => now - full >= ttl_secs,
                None => true,
            }
        } else {
            now - self.updated_at >= ttl_secs
        }
    }
}

/// Store for cached entity records.
#[async_trait]
pub trait EntityCacheStore: Send + Sync {
    /// Load the cached row for (kind, id), if any.
    async fn load(&self, kind: EntityKind, id: &str) -> Result<Option<CachedRecord>>;

    /// Load the cached rows for several ids of one kind. Missing ids are
    /// simply absent from the result.
    async fn load_many(&self, kind: EntityKind, ids: &[String]) -> Result<Vec<CachedRecord>>;

    /// Insert or replace one cached row.
    ///
    /// A `None` `full_updated_at` keeps the stored stamp, so a caller
    /// overwriting a full row with a partial refresh must store a
    /// record that still carries the full fields the stamp vouches for.
    async fn upsert(&self, record: &CachedRecord) -> Result<()>;

    /// Insert or replace several rows atomically. Either every row is
    /// visible afterwards or none is.
    async fn upsert_many(&self, records: &[CachedRecord]) -> Result<()>;

    /// Drop the cached row for (kind, id).
    ///
    /// Returns `true` if a row existed.
    async fn invalidate(&self, kind: EntityKind, id: &str) -> Result<bool>;

    /// Drop every cached row of one kind. Returns the number removed.
    async fn invalidate_kind(&self, kind: EntityKind) -> Result<u64>;
}

/// SQLite implementation of [`EntityCacheStore`].
pub struct SqliteEntityCacheStore {
    pool: SqlitePool,
}

impl SqliteEntityCacheStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityCacheStore for SqliteEntityCacheStore {
    #[instrument(skip(self))]
    async fn load(&self, kind: EntityKind, id: &str) -> Result<Option<CachedRecord>> {
        let row = query_as::<_, CachedRecord>(
            "SELECT kind, id, record, updated_at, full_updated_at
             FROM entity_cache WHERE kind = ? AND id = ?",
        )
        .bind(kind.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn load_many(&self, kind: EntityKind, ids: &[String]) -> Result<Vec<CachedRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // sqlx has no array binding for SQLite; build the placeholder list.
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT kind, id, record, updated_at, full_updated_at
             FROM entity_cache WHERE kind = ? AND id IN ({})",
            placeholders
        );

        let mut q = query_as::<_, CachedRecord>(&sql).bind(kind.as_str());
        for id in ids {
            q = q.bind(id);
        }

        Ok(q.fetch_all(&self.pool).await?)
    }

    #[instrument(skip(self, record), fields(kind = %record.kind, id = %record.id))]
    async fn upsert(&self, record: &CachedRecord) -> Result<()> {
        self.upsert_many(std::slice::from_ref(record)).await
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert_many(&self, records: &[CachedRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            query(
                "INSERT INTO entity_cache (kind, id, record, updated_at, full_updated_at)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT (kind, id) DO UPDATE SET
                     record = excluded.record,
                     updated_at = excluded.updated_at,
                     full_updated_at = COALESCE(excluded.full_updated_at, entity_cache.full_updated_at)",
            )
            .bind(&record.kind)
            .bind(&record.id)
            .bind(&record.record)
            .bind(record.updated_at)
            .bind(record.full_updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn invalidate(&self, kind: EntityKind, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let result = query("DELETE FROM entity_cache WHERE kind = ? AND id = ?")
            .bind(kind.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn invalidate_kind(&self, kind: EntityKind) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let result = query("DELETE FROM entity_cache WHERE kind = ?")
            .bind(kind.as_str())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    fn record(id: &str, updated_at: i64, full: Option<i64>) -> CachedRecord {
        CachedRecord {
            kind: "album".to_string(),
            id: id.to_string(),
            record: format!("{{\"id\":\"{}\"}}", id),
            updated_at,
            full_updated_at: full,
        }
    }

    #[tokio::test]
    async fn upsert_then_load_round_trips() {
        let pool = create_test_pool().await.unwrap();
        let store = SqliteEntityCacheStore::new(pool);

        let rec = record("al1", 1000, None);
        store.upsert(&rec).await.unwrap();

        let loaded = store.load(EntityKind::Album, "al1").await.unwrap().unwrap();
        assert_eq!(loaded, rec);
        assert!(store.load(EntityKind::Album, "al2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_preserves_full_stamp_on_partial_refresh() {
        let pool = create_test_pool().await.unwrap();
        let store = SqliteEntityCacheStore::new(pool);

        store.upsert(&record("al1", 1000, Some(1000))).await.unwrap();
        // A later partial refresh updates the record but not the full stamp.
        store.upsert(&record("al1", 2000, None)).await.unwrap();

        let loaded = store.load(EntityKind::Album, "al1").await.unwrap().unwrap();
        assert_eq!(loaded.updated_at, 2000);
        assert_eq!(loaded.full_updated_at, Some(1000));
    }

    #[tokio::test]
    async fn load_many_returns_only_present_ids() {
        let pool = create_test_pool().await.unwrap();
        let store = SqliteEntityCacheStore::new(pool);

        store
            .upsert_many(&[record("a", 1, None), record("b", 2, None)])
            .await
            .unwrap();

        let rows = store
            .load_many(
                EntityKind::Album,
                &["a".to_string(), "b".to_string(), "missing".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn invalidate_removes_single_row_and_kind_removes_all() {
        let pool = create_test_pool().await.unwrap();
        let store = SqliteEntityCacheStore::new(pool);

        store
            .upsert_many(&[record("a", 1, None), record("b", 2, None)])
            .await
            .unwrap();

        assert!(store.invalidate(EntityKind::Album, "a").await.unwrap());
        assert!(!store.invalidate(EntityKind::Album, "a").await.unwrap());
        assert_eq!(store.invalidate_kind(EntityKind::Album).await.unwrap(), 1);
    }

    #[test]
    fn staleness_judgement() {
        let rec = record("a", 1000, None);
        assert!(!rec.is_stale(1100, 200, false));
        assert!(rec.is_stale(1300, 200, false));
        // No full stamp: always stale when full fields are required.
        assert!(rec.is_stale(1001, 10_000, true));

        let full = record("a", 1000, Some(900));
        assert!(!full.is_stale(1000, 200, true));
        assert!(full.is_stale(1200, 200, true));
    }
}
