
use tracing::{debug, info};

use crate::config::Config;
use crate::database::sqlite::Database;
use crate::database::sqlite::models::{ChunkRow, NewChunkRow, StorageBackend};
use crate::embeddings::OpenAIClient;
use crate::ingestion::{ChunkAssembler, Chunker, SourceDocument};
use crate::similarity::ScoredMatch;
use crate::store::{LocalStore, QdrantStore, points_from_rows};
use crate::tokenizer::Tokenizer;
use crate::{KbError, Result};

/// Rows pushed to the external store per migration round.
const MIGRATION_BATCH_SIZE: i64 = 100;

/// End-to-end orchestration: documents in, chunk rows and vectors persisted,
/// similarity queries answered.
///
/// Which backend serves a query follows the configuration: with a Qdrant
/// endpoint configured, ranking is delegated to the service; otherwise the
/// local brute-force scorer runs over the chunk table.
#[derive(Debug, Clone)]
pub struct KnowledgePipeline {
    database: Database,
    assembler: ChunkAssembler,
    embeddings: OpenAIClient,
    local: LocalStore,
    qdrant: Option<QdrantStore>,
    embedding_dimension: u32,
    max_results: usize,
}

/// Outcome of ingesting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub source_id: Option<String>,
    pub chunks_created: usize,
    /// Chunks belonging to the same source that were superseded.
    pub chunks_replaced: u64,
    pub total_tokens: usize,
}

/// Snapshot of what the knowledge base currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBaseStatus {
    pub total_chunks: i64,
    pub local_chunks: i64,
    pub migrated_chunks: i64,
    pub external_store_configured: bool,
}

impl KnowledgePipeline {
    #[inline]
    pub async fn new(config: &Config) -> Result<Self> {
        let database = Database::new(config.database_path()).await?;

        let tokenizer = Tokenizer::new()?;
        let chunker = Chunker::new(tokenizer.clone());
        let assembler = ChunkAssembler::new(tokenizer, chunker, config.ingestion.max_tokens);

        let embeddings = OpenAIClient::new(config)?;
        let local = LocalStore::new(database.clone(), config.search.similarity_threshold);
        let qdrant = config
            .qdrant
            .as_ref()
            .map(QdrantStore::new)
            .transpose()?;

        Ok(Self {
            database,
            assembler,
            embeddings,
            local,
            qdrant,
            embedding_dimension: config.embeddings.dimension,
            max_results: config.search.max_results,
        })
    }

    /// Ingest one document: chunk it, embed every chunk, persist the rows,
    /// and push the vectors to the external store when one is configured.
    ///
    /// A document with a source id supersedes its previous chunks, so
    /// re-ingesting an updated document never leaves stale rows behind.
    #[inline]
    pub async fn ingest(&self, document: &SourceDocument) -> Result<IngestReport> {
        // The collection must exist before the supersede-delete below can
        // run against it.
        if let Some(store) = &self.qdrant {
            store.ensure_collection(self.embedding_dimension)?;
        }

        let chunks_replaced = match &document.id {
            Some(source_id) => self.delete_source(source_id).await?,
            None => 0,
        };

        let records = self.assembler.chunk_document(document);
        let texts: Vec<String> = records
            .iter()
            .map(|record| record.chunk_text.clone())
            .collect();
        let vectors = self.embeddings.embed_texts(&texts)?;

        let mut rows = Vec::with_capacity(records.len());
        for (record, vector) in records.into_iter().zip(vectors) {
            let row = self
                .database
                .insert_chunk(NewChunkRow {
                    source_id: record.source_id,
                    source_title: record.source_title,
                    chunk_text: record.chunk_text,
                    token_count: record.token_count as i64,
                    embedding: Some(vector),
                })
                .await?;
            rows.push(row);
        }

        if let Some(store) = &self.qdrant {
            let points = points_from_rows(&rows)?;
            store.upsert_points(&points)?;

            for row in &rows {
                self.database.mark_migrated(row.id).await?;
            }
        }

        let total_tokens = rows.iter().map(|row| row.token_count as usize).sum();

        info!(
            "Ingested '{}': {} chunk(s), {} token(s), {} replaced",
            document.title,
            rows.len(),
            total_tokens,
            chunks_replaced
        );

        Ok(IngestReport {
            source_id: document.id.clone(),
            chunks_created: rows.len(),
            chunks_replaced,
            total_tokens,
        })
    }

    /// Answer a query with the best-matching chunk payloads.
    #[inline]
    pub async fn search(&self, query: &str) -> Result<Vec<ScoredMatch>> {
        let vector = self.embeddings.embed_text(query)?;

        match &self.qdrant {
            Some(store) => {
                debug!("Delegating search to Qdrant");
                store.search(&vector, self.max_results)
            }
            None => {
                debug!("Serving search from the local fallback");
                self.local.search(&vector, self.max_results).await
            }
        }
    }

    /// Remove every chunk belonging to `source_id`, locally and in the
    /// external store.
    #[inline]
    pub async fn delete_source(&self, source_id: &str) -> Result<u64> {
        let deleted = self.database.delete_source(source_id).await?;

        if let Some(store) = &self.qdrant {
            store.delete_by_source(source_id)?;
        }

        if deleted > 0 {
            info!("Deleted {} chunk(s) for source '{}'", deleted, source_id);
        }

        Ok(deleted)
    }

    /// Push locally held vectors to the external store in batches, marking
    /// each migrated row, until none remain.
    #[inline]
    pub async fn migrate_local_data(&self) -> Result<usize> {
        let Some(store) = &self.qdrant else {
            return Err(KbError::Config(
                "No Qdrant endpoint configured; nothing to migrate to".to_string(),
            ));
        };

        store.ensure_collection(self.embedding_dimension)?;

        let mut migrated = 0usize;
        loop {
            let batch = self.database.unmigrated_batch(MIGRATION_BATCH_SIZE).await?;
            if batch.is_empty() {
                break;
            }

            let points = points_from_rows(&batch)?;
            store.upsert_points(&points)?;

            for row in &batch {
                self.database.mark_migrated(row.id).await?;
            }

            migrated += batch.len();
            debug!("Migrated batch of {} chunk(s)", batch.len());

            if (batch.len() as i64) < MIGRATION_BATCH_SIZE {
                break;
            }
        }

        info!("Migration complete: {} chunk(s) moved", migrated);
        Ok(migrated)
    }

    #[inline]
    pub async fn status(&self) -> Result<KnowledgeBaseStatus> {
        Ok(KnowledgeBaseStatus {
            total_chunks: self.database.count_chunks().await?,
            local_chunks: self
                .database
                .count_by_storage(StorageBackend::Local)
                .await?,
            migrated_chunks: self
                .database
                .count_by_storage(StorageBackend::Qdrant)
                .await?,
            external_store_configured: self.qdrant.is_some(),
        })
    }

    #[inline]
    pub async fn list_chunks(&self) -> Result<Vec<ChunkRow>> {
        Ok(self.database.list_chunks().await?)
    }

    /// Verify the embedding service is reachable and serves the configured
    /// model.
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        Ok(self.embeddings.health_check()?)
    }

    #[inline]
    pub fn database(&self) -> &Database {
        &self.database
    }
}
