//! Saved-library membership store
//!
//! Membership is a plain set of ids per (user, kind). Individual toggles
//! mutate single rows; a full resync replaces the set wholesale and is
//! the only operation that touches `library_updated`.

use crate::error::Result;
use crate::models::EntityKind;
use async_trait::async_trait;
use sqlx::{query, query_as, query_scalar, SqlitePool};
use std::collections::HashSet;
use tracing::instrument;

/// Membership set plus staleness metadata for one (user, kind) library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSetRecord {
    pub ids: HashSet<String>,
    /// Epoch seconds of the last full resync, `None` before the first.
    pub library_updated: Option<i64>,
}

impl SavedSetRecord {
    pub fn empty() -> Self {
        Self {
            ids: HashSet::new(),
            library_updated: None,
        }
    }
}

/// Store for saved-library membership.
#[async_trait]
pub trait SavedSetStore: Send + Sync {
    /// Load the membership set and staleness metadata.
    async fn load(&self, user_id: &str, kind: EntityKind) -> Result<SavedSetRecord>;

    /// Flip membership of one id. Idempotent: saving an already-saved id
    /// or unsaving an absent one is a no-op.
    async fn set_membership(
        &self,
        user_id: &str,
        kind: EntityKind,
        entity_id: &str,
        saved: bool,
        now: i64,
    ) -> Result<()>;

    /// Replace the whole set and stamp `library_updated`, atomically.
    async fn replace_all(
        &self,
        user_id: &str,
        kind: EntityKind,
        ids: &[String],
        now: i64,
    ) -> Result<()>;
}

/// SQLite implementation of [`SavedSetStore`].
pub struct SqliteSavedSetStore {
    pool: SqlitePool,
}

impl SqliteSavedSetStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SavedSetStore for SqliteSavedSetStore {
    #[instrument(skip(self))]
    async fn load(&self, user_id: &str, kind: EntityKind) -> Result<SavedSetRecord> {
        // One transaction for both selects: a concurrent replace_all
        // must not pair old ids with the new stamp.
        let mut tx = self.pool.begin().await?;

        let ids: Vec<(String,)> = query_as(
            "SELECT entity_id FROM saved_items WHERE user_id = ? AND kind = ?",
        )
        .bind(user_id)
        .bind(kind.as_str())
        .fetch_all(&mut *tx)
        .await?;

        let library_updated: Option<i64> = query_scalar(
            "SELECT library_updated FROM saved_libraries WHERE user_id = ? AND kind = ?",
        )
        .bind(user_id)
        .bind(kind.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SavedSetRecord {
            ids: ids.into_iter().map(|(id,)| id).collect(),
            library_updated,
        })
    }

    #[instrument(skip(self))]
    async fn set_membership(
        &self,
        user_id: &str,
        kind: EntityKind,
        entity_id: &str,
        saved: bool,
        now: i64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if saved {
            query(
                "INSERT INTO saved_items (user_id, kind, entity_id, saved_at)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT (user_id, kind, entity_id) DO NOTHING",
            )
            .bind(user_id)
            .bind(kind.as_str())
            .bind(entity_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        } else {
            query("DELETE FROM saved_items WHERE user_id = ? AND kind = ? AND entity_id = ?")
                .bind(user_id)
                .bind(kind.as_str())
                .bind(entity_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn replace_all(
        &self,
        user_id: &str,
        kind: EntityKind,
        ids: &[String],
        now: i64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        query("DELETE FROM saved_items WHERE user_id = ? AND kind = ?")
            .bind(user_id)
            .bind(kind.as_str())
            .execute(&mut *tx)
            .await?;

        for id in ids {
            query(
                "INSERT INTO saved_items (user_id, kind, entity_id, saved_at)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT (user_id, kind, entity_id) DO NOTHING",
            )
            .bind(user_id)
            .bind(kind.as_str())
            .bind(id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        query(
            "INSERT INTO saved_libraries (user_id, kind, library_updated)
             VALUES (?, ?, ?)
             ON CONFLICT (user_id, kind) DO UPDATE SET library_updated = excluded.library_updated",
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn fresh_library_is_empty_with_no_stamp() {
        let pool = create_test_pool().await.unwrap();
        let store = SqliteSavedSetStore::new(pool);

        let loaded = store.load("u1", EntityKind::Album).await.unwrap();
        assert_eq!(loaded, SavedSetRecord::empty());
    }

    #[tokio::test]
    async fn toggles_are_idempotent_and_do_not_stamp_library() {
        let pool = create_test_pool().await.unwrap();
        let store = SqliteSavedSetStore::new(pool);

        store
            .set_membership("u1", EntityKind::Album, "al1", true, 100)
            .await
            .unwrap();
        store
            .set_membership("u1", EntityKind::Album, "al1", true, 200)
            .await
            .unwrap();

        let loaded = store.load("u1", EntityKind::Album).await.unwrap();
        assert_eq!(loaded.ids.len(), 1);
        assert!(loaded.ids.contains("al1"));
        assert_eq!(loaded.library_updated, None);

        store
            .set_membership("u1", EntityKind::Album, "al1", false, 300)
            .await
            .unwrap();
        store
            .set_membership("u1", EntityKind::Album, "al1", false, 400)
            .await
            .unwrap();
        let loaded = store.load("u1", EntityKind::Album).await.unwrap();
        assert!(loaded.ids.is_empty());
    }

    #[tokio::test]
    async fn replace_all_swaps_set_and_stamps_library() {
        let pool = create_test_pool().await.unwrap();
        let store = SqliteSavedSetStore::new(pool);

        store
            .set_membership("u1", EntityKind::Track, "old", true, 10)
            .await
            .unwrap();
        store
            .replace_all(
                "u1",
                EntityKind::Track,
                &["t1".to_string(), "t2".to_string()],
                500,
            )
            .await
            .unwrap();

        let loaded = store.load("u1", EntityKind::Track).await.unwrap();
        assert!(!loaded.ids.contains("old"));
        assert!(loaded.ids.contains("t1") && loaded.ids.contains("t2"));
        assert_eq!(loaded.library_updated, Some(500));
    }

    #[tokio::test]
    async fn libraries_are_isolated_per_user_and_kind() {
        let pool = create_test_pool().await.unwrap();
        let store = SqliteSavedSetStore::new(pool);

        store
            .set_membership("u1", EntityKind::Album, "al1", true, 1)
            .await
            .unwrap();
        store
            .set_membership("u2", EntityKind::Album, "al2", true, 1)
            .await
            .unwrap();
        store
            .set_membership("u1", EntityKind::Track, "t1", true, 1)
            .await
            .unwrap();

        let albums_u1 = store.load("u1", EntityKind::Album).await.unwrap();
        assert_eq!(albums_u1.ids, HashSet::from(["al1".to_string()]));
    }
}
