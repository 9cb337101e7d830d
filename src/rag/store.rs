//! SQLite-backed knowledge store.
//!
//! Passages live in one table keyed by `(collection, passage_id)`; the
//! SQLite rowid records insertion order. Search is brute-force cosine
//! distance over the collection's stored embeddings.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::embedder::Embedder;
use super::vector_math::rank_ascending_by_distance;
use crate::core::errors::BotError;

const EMBED_BATCH_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    pub text: String,
}

/// A passage returned by [`KnowledgeStore::query`] with its cosine distance
/// (lower = closer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageMatch {
    pub passage: Passage,
    pub distance: f32,
}

pub struct KnowledgeStore {
    pool: SqlitePool,
    collection: String,
    embedder: Arc<dyn Embedder>,
}

impl KnowledgeStore {
    pub async fn open(
        db_path: &Path,
        collection: &str,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, BotError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                BotError::InvalidConfig(format!(
                    "cannot create knowledge store directory {}: {}",
                    parent.display(),
                    err
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            collection: collection.to_string(),
            embedder,
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), BotError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS passages (
                collection TEXT NOT NULL,
                passage_id TEXT NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (collection, passage_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    async fn existing_ids(&self) -> Result<HashSet<String>, BotError> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT passage_id FROM passages WHERE collection = ?1")
                .bind(&self.collection)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().collect())
    }

    /// Index passages whose id is not yet in the collection. Returns how many
    /// were added; rebuilding with the same passages adds none.
    pub async fn build<I>(&self, passages: I) -> Result<usize, BotError>
    where
        I: IntoIterator<Item = Passage>,
    {
        let mut seen = self.existing_ids().await?;
        let fresh: Vec<Passage> = passages
            .into_iter()
            .filter(|passage| seen.insert(passage.id.clone()))
            .collect();

        if fresh.is_empty() {
            tracing::info!(
                "Knowledge store '{}' already up to date",
                self.collection
            );
            return Ok(0);
        }

        let mut inserted = 0usize;
        for batch in fresh.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
            let embeddings = self.embedder.embed(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(BotError::UpstreamFailure(format!(
                    "embedder returned {} vectors for {} passages",
                    embeddings.len(),
                    batch.len()
                )));
            }

            let mut tx = self.pool.begin().await?;
            for (passage, embedding) in batch.iter().zip(embeddings.iter()) {
                let result = sqlx::query(
                    "INSERT OR IGNORE INTO passages (collection, passage_id, content, embedding)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .bind(&self.collection)
                .bind(&passage.id)
                .bind(&passage.text)
                .bind(Self::serialize_embedding(embedding))
                .execute(&mut *tx)
                .await?;
                inserted += result.rows_affected() as usize;
            }
            tx.commit().await?;
        }

        tracing::info!(
            "Indexed {} passages into '{}'",
            inserted,
            self.collection
        );
        Ok(inserted)
    }

    /// The `k` nearest passages by ascending cosine distance, ties in
    /// insertion order. Fails with `NotReady` while the collection is empty.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<PassageMatch>, BotError> {
        if self.count().await? == 0 {
            return Err(BotError::NotReady(format!(
                "collection '{}' has no passages",
                self.collection
            )));
        }

        let query_embedding = self
            .embedder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BotError::UpstreamFailure("embedder returned no vector".to_string()))?;

        let rows = sqlx::query(
            "SELECT passage_id, content, embedding
             FROM passages
             WHERE collection = ?1
             ORDER BY rowid",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let mut passages = Vec::with_capacity(rows.len());
        let mut embeddings = Vec::with_capacity(rows.len());
        for row in &rows {
            let bytes: Vec<u8> = row.get("embedding");
            embeddings.push(Self::deserialize_embedding(&bytes));
            passages.push(Passage {
                id: row.get("passage_id"),
                text: row.get("content"),
            });
        }

        let matches = rank_ascending_by_distance(&query_embedding, &embeddings)
            .into_iter()
            .take(k)
            .map(|(idx, distance)| PassageMatch {
                passage: passages[idx].clone(),
                distance,
            })
            .collect();

        Ok(matches)
    }

    pub async fn count(&self) -> Result<usize, BotError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM passages WHERE collection = ?1")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    /// Remove every passage of this collection.
    pub async fn clear(&self) -> Result<usize, BotError> {
        let result = sqlx::query("DELETE FROM passages WHERE collection = ?1")
            .bind(&self.collection)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }
}
