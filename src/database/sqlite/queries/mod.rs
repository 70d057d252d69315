
use super::models::{ChunkRow, NewChunkRow, StorageBackend};
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;

const ALL_COLUMNS: &str = "id, source_id, source_title, chunk_text, token_count, \
                           embedding, storage, created_date";

pub struct ChunkQueries;

impl ChunkQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, new_row: NewChunkRow) -> Result<ChunkRow> {
        let now = Utc::now().naive_utc();
        let embedding_json = new_row.embedding_json()?;

        let id = sqlx::query(
            "INSERT INTO chunks (source_id, source_title, chunk_text, token_count, \
             embedding, storage, created_date) VALUES (?, ?, ?, ?, ?, 'local', ?)",
        )
        .bind(&new_row.source_id)
        .bind(&new_row.source_title)
        .bind(&new_row.chunk_text)
        .bind(new_row.token_count)
        .bind(&embedding_json)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to insert chunk row")?
        .last_insert_rowid();

        Self::get_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve inserted chunk row"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<ChunkRow>> {
        let row = sqlx::query_as::<_, ChunkRow>(&format!(
            "SELECT {ALL_COLUMNS} FROM chunks WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get chunk row by id")?;

        Ok(row)
    }

    #[inline]
    pub async fn get_by_source(pool: &SqlitePool, source_id: &str) -> Result<Vec<ChunkRow>> {
        let rows = sqlx::query_as::<_, ChunkRow>(&format!(
            "SELECT {ALL_COLUMNS} FROM chunks WHERE source_id = ? ORDER BY id"
        ))
        .bind(source_id)
        .fetch_all(pool)
        .await
        .context("Failed to get chunk rows by source")?;

        Ok(rows)
    }

    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<ChunkRow>> {
        let rows = sqlx::query_as::<_, ChunkRow>(&format!(
            "SELECT {ALL_COLUMNS} FROM chunks ORDER BY id"
        ))
        .fetch_all(pool)
        .await
        .context("Failed to list chunk rows")?;

        Ok(rows)
    }

    /// Rows whose embedding has been generated, in insertion order. These are
    /// the candidates for local similarity ranking.
    #[inline]
    pub async fn list_embedded(pool: &SqlitePool) -> Result<Vec<ChunkRow>> {
        let rows = sqlx::query_as::<_, ChunkRow>(&format!(
            "SELECT {ALL_COLUMNS} FROM chunks WHERE embedding IS NOT NULL ORDER BY id"
        ))
        .fetch_all(pool)
        .await
        .context("Failed to list embedded chunk rows")?;

        Ok(rows)
    }

    /// A batch of embedded rows still held by `storage`, oldest first.
    #[inline]
    pub async fn get_batch_by_storage(
        pool: &SqlitePool,
        storage: StorageBackend,
        limit: i64,
    ) -> Result<Vec<ChunkRow>> {
        let rows = sqlx::query_as::<_, ChunkRow>(&format!(
            "SELECT {ALL_COLUMNS} FROM chunks \
             WHERE storage = ? AND embedding IS NOT NULL ORDER BY id LIMIT ?"
        ))
        .bind(storage)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to get chunk rows by storage")?;

        Ok(rows)
    }

    #[inline]
    pub async fn update_storage(
        pool: &SqlitePool,
        id: i64,
        storage: StorageBackend,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE chunks SET storage = ? WHERE id = ?")
            .bind(storage)
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to update chunk row storage")?;

        Ok(result.rows_affected() > 0)
    }

    #[inline]
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM chunks WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to delete chunk row")?;

        Ok(result.rows_affected() > 0)
    }

    #[inline]
    pub async fn delete_by_source(pool: &SqlitePool, source_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chunks WHERE source_id = ?")
            .bind(source_id)
            .execute(pool)
            .await
            .context("Failed to delete chunk rows by source")?;

        Ok(result.rows_affected())
    }

    #[inline]
    pub async fn count_all(pool: &SqlitePool) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(pool)
            .await
            .context("Failed to count chunk rows")?;

        Ok(count)
    }

    #[inline]
    pub async fn count_by_storage(pool: &SqlitePool, storage: StorageBackend) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE storage = ?")
            .bind(storage)
            .fetch_one(pool)
            .await
            .context("Failed to count chunk rows by storage")?;

        Ok(count)
    }
}
