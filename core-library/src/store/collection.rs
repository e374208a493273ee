//! Locally edited collection order store
//!
//! Holds the desired order the user has produced locally, which the
//! order reconciler later pushes to the remote. Positions are dense and
//! zero-based; an order replacement is atomic.

use crate::error::Result;
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};
use tracing::instrument;

/// Store for locally edited ordered collections.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Item ids of a collection in position order. Empty when unknown.
    async fn load_order(&self, collection_id: &str) -> Result<Vec<String>>;

    /// Replace the collection's order atomically with dense zero-based
    /// positions. An empty slice clears the collection.
    async fn replace_order(&self, collection_id: &str, item_ids: &[String]) -> Result<()>;
}

/// SQLite implementation of [`CollectionStore`].
pub struct SqliteCollectionStore {
    pool: SqlitePool,
}

impl SqliteCollectionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CollectionStore for SqliteCollectionStore {
    #[instrument(skip(self))]
    async fn load_order(&self, collection_id: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = query_as(
            "SELECT item_id FROM collection_items WHERE collection_id = ? ORDER BY position ASC",
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    #[instrument(skip(self, item_ids), fields(count = item_ids.len()))]
    async fn replace_order(&self, collection_id: &str, item_ids: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        query("DELETE FROM collection_items WHERE collection_id = ?")
            .bind(collection_id)
            .execute(&mut *tx)
            .await?;

        for (position, item_id) in item_ids.iter().enumerate() {
            query(
                "INSERT INTO collection_items (collection_id, position, item_id)
                 VALUES (?, ?, ?)",
            )
            .bind(collection_id)
            .bind(position as i64)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn replace_then_load_preserves_order_and_duplicates() {
        let pool = create_test_pool().await.unwrap();
        let store = SqliteCollectionStore::new(pool);

        let order = vec![
            "t2".to_string(),
            "t1".to_string(),
            "t2".to_string(),
            "t3".to_string(),
        ];
        store.replace_order("pl1", &order).await.unwrap();

        assert_eq!(store.load_order("pl1").await.unwrap(), order);
    }

    #[tokio::test]
    async fn empty_replacement_clears_the_collection() {
        let pool = create_test_pool().await.unwrap();
        let store = SqliteCollectionStore::new(pool);

        store
            .replace_order("pl1", &["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        store.replace_order("pl1", &[]).await.unwrap();

        assert!(store.load_order("pl1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn collections_are_independent() {
        let pool = create_test_pool().await.unwrap();
        let store = SqliteCollectionStore::new(pool);

        store.replace_order("pl1", &["a".to_string()]).await.unwrap();
        store.replace_order("pl2", &["b".to_string()]).await.unwrap();

        assert_eq!(store.load_order("pl1").await.unwrap(), vec!["a"]);
        assert_eq!(store.load_order("pl2").await.unwrap(), vec!["b"]);
    }
}
