//! SQLite vector store backend.
//!
//! Provides [`SqliteVectorStore`] which implements [`VectorStore`] on a local
//! SQLite file via [sqlx](https://docs.rs/sqlx). Embeddings are stored as
//! little-endian `f32` blobs and scored with brute-force cosine similarity.
//!
//! Every write runs in one transaction with `synchronous = FULL`, so once
//! [`VectorStore::upsert`] returns the passages are on disk. Collections are
//! identified by their stable name and survive restarts.
//!
//! # Example
//!
//! ```rust,ignore
//! use lingua_rag::sqlite::SqliteVectorStore;
//!
//! let store = SqliteVectorStore::open("lingua_index.db").await?;
//! store.create_collection("nlp_documents", 1536).await?;
//! ```

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::document::{EmbeddedPassage, Passage, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, cosine_similarity, rank};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS collections (
        name TEXT PRIMARY KEY,
        dimensions INTEGER NOT NULL,
        created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
    )",
    "CREATE TABLE IF NOT EXISTS passages (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        collection TEXT NOT NULL REFERENCES collections(name) ON DELETE CASCADE,
        id TEXT NOT NULL,
        content TEXT NOT NULL,
        source TEXT NOT NULL,
        page INTEGER NOT NULL,
        chunk_index INTEGER NOT NULL,
        char_offset INTEGER NOT NULL,
        embedding BLOB NOT NULL,
        UNIQUE (collection, id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_passages_collection ON passages(collection, seq)",
];

/// A [`VectorStore`] persisted in a SQLite database file.
pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    /// Open (creating if missing) the database at `path` and ensure the schema exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(Self::map_err)?;

        let store = Self::from_pool(pool);
        store.init_schema().await?;
        debug!(path = %path.as_ref().display(), "opened sqlite vector store");
        Ok(store)
    }

    /// Wrap an existing pool. The caller is responsible for the schema; use
    /// [`open`](Self::open) unless the pool is shared with other tables.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await.map_err(Self::map_err)?;
        }
        Ok(())
    }

    fn map_err(e: sqlx::Error) -> RagError {
        RagError::VectorStoreError { backend: "sqlite".to_string(), message: e.to_string() }
    }

    fn store_error(message: String) -> RagError {
        RagError::VectorStoreError { backend: "sqlite".to_string(), message }
    }

    async fn dimensions_of(&self, collection: &str) -> Result<usize> {
        let row = sqlx::query("SELECT dimensions FROM collections WHERE name = ?1")
            .bind(collection)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_err)?
            .ok_or_else(|| Self::store_error(format!("collection '{collection}' does not exist")))?;
        let dimensions: i64 = row.try_get("dimensions").map_err(Self::map_err)?;
        Ok(dimensions as usize)
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

    fn row_to_passage(row: &SqliteRow) -> Result<(Passage, Vec<f32>)> {
        let page: i64 = row.try_get("page").map_err(Self::map_err)?;
        let chunk_index: i64 = row.try_get("chunk_index").map_err(Self::map_err)?;
        let char_offset: i64 = row.try_get("char_offset").map_err(Self::map_err)?;
        let embedding: Vec<u8> = row.try_get("embedding").map_err(Self::map_err)?;

        let passage = Passage {
            id: row.try_get("id").map_err(Self::map_err)?,
            content: row.try_get("content").map_err(Self::map_err)?,
            source: row.try_get("source").map_err(Self::map_err)?,
            page: page as u32,
            chunk_index: chunk_index as usize,
            char_offset: char_offset as usize,
        };
        Ok((passage, Self::deserialize_embedding(&embedding)))
    }
}

fn check_dimensions(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(SqliteVectorStore::store_error(format!(
            "embedding has {actual} dimensions, collection expects {expected}"
        )));
    }
    Ok(())
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO collections (name, dimensions) VALUES (?1, ?2)")
            .bind(name)
            .bind(dimensions as i64)
            .execute(&self.pool)
            .await
            .map_err(Self::map_err)?;

        check_dimensions(self.dimensions_of(name).await?, dimensions)?;
        debug!(collection = name, dimensions, "ensured sqlite collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Self::map_err)?;
        sqlx::query("DELETE FROM passages WHERE collection = ?1")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(Self::map_err)?;
        sqlx::query("DELETE FROM collections WHERE name = ?1")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(Self::map_err)?;
        tx.commit().await.map_err(Self::map_err)?;

        debug!(collection = name, "deleted sqlite collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, passages: &[EmbeddedPassage]) -> Result<usize> {
        let dimensions = self.dimensions_of(collection).await?;
        for entry in passages {
            check_dimensions(dimensions, entry.embedding.len())?;
        }
        if passages.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(Self::map_err)?;
        let mut inserted = 0u64;
        for entry in passages {
            let passage = &entry.passage;
            let result = sqlx::query(
                "INSERT OR IGNORE INTO passages
                    (collection, id, content, source, page, chunk_index, char_offset, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .bind(collection)
            .bind(&passage.id)
            .bind(&passage.content)
            .bind(&passage.source)
            .bind(passage.page as i64)
            .bind(passage.chunk_index as i64)
            .bind(passage.char_offset as i64)
            .bind(Self::serialize_embedding(&entry.embedding))
            .execute(&mut *tx)
            .await
            .map_err(Self::map_err)?;
            inserted += result.rows_affected();
        }
        tx.commit().await.map_err(Self::map_err)?;

        debug!(collection, count = passages.len(), inserted, "upserted passages to sqlite");
        Ok(inserted as usize)
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        check_dimensions(self.dimensions_of(collection).await?, embedding.len())?;

        let rows = sqlx::query(
            "SELECT id, content, source, page, chunk_index, char_offset, embedding
             FROM passages WHERE collection = ?1 ORDER BY seq",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::map_err)?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in &rows {
            let (passage, stored) = Self::row_to_passage(row)?;
            let score = cosine_similarity(&stored, embedding);
            scored.push(SearchResult { passage, score });
        }

        Ok(rank(scored, top_k))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        self.dimensions_of(collection).await?;
        let row = sqlx::query("SELECT COUNT(*) AS n FROM passages WHERE collection = ?1")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .map_err(Self::map_err)?;
        let n: i64 = row.try_get("n").map_err(Self::map_err)?;
        Ok(n as usize)
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        debug!("closed sqlite vector store");
        Ok(())
    }
}
