use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::database::sqlite::models::{ChunkRow, NewChunkRow, StorageBackend};
use crate::database::sqlite::queries::ChunkQueries;


pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

/// Handle over the chunk table used by the pipeline.
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    #[inline]
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    #[inline]
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    #[inline]
    pub async fn insert_chunk(&self, chunk: NewChunkRow) -> Result<ChunkRow> {
        ChunkQueries::create(&self.pool, chunk).await
    }

    #[inline]
    pub async fn get_chunk(&self, id: i64) -> Result<Option<ChunkRow>> {
        ChunkQueries::get_by_id(&self.pool, id).await
    }

    #[inline]
    pub async fn chunks_for_source(&self, source_id: &str) -> Result<Vec<ChunkRow>> {
        ChunkQueries::get_by_source(&self.pool, source_id).await
    }

    #[inline]
    pub async fn list_chunks(&self) -> Result<Vec<ChunkRow>> {
        ChunkQueries::list_all(&self.pool).await
    }

    #[inline]
    pub async fn embedded_chunks(&self) -> Result<Vec<ChunkRow>> {
        ChunkQueries::list_embedded(&self.pool).await
    }

    #[inline]
    pub async fn unmigrated_batch(&self, limit: i64) -> Result<Vec<ChunkRow>> {
        ChunkQueries::get_batch_by_storage(&self.pool, StorageBackend::Local, limit).await
    }

    #[inline]
    pub async fn mark_migrated(&self, id: i64) -> Result<bool> {
        ChunkQueries::update_storage(&self.pool, id, StorageBackend::Qdrant).await
    }

    #[inline]
    pub async fn delete_source(&self, source_id: &str) -> Result<u64> {
        ChunkQueries::delete_by_source(&self.pool, source_id).await
    }

    #[inline]
    pub async fn count_chunks(&self) -> Result<i64> {
        ChunkQueries::count_all(&self.pool).await
    }

    #[inline]
    pub async fn count_by_storage(&self, storage: StorageBackend) -> Result<i64> {
        ChunkQueries::count_by_storage(&self.pool, storage).await
    }

    /// Reclaim space and refresh query planner statistics.
    #[inline]
    pub async fn optimize(&self) -> Result<()> {
        info!("Optimizing database");

        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .context("Failed to vacuum database")?;

        sqlx::query("ANALYZE")
            .execute(&self.pool)
            .await
            .context("Failed to analyze database")?;

        Ok(())
    }
}
