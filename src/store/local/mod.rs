
use tracing::debug;

use crate::database::sqlite::Database;
use crate::similarity::{self, ScoredMatch, StoredVector};
use crate::store::ChunkPayload;
use crate::{KbError, Result};

/// Brute-force similarity search over the chunk table.
///
/// This is the fallback path used when no external vector database is
/// configured: every embedded row is scored against the query, filtered by
/// the acceptance threshold, and ranked. Linear in the number of stored
/// chunks, which is fine at the hundreds-to-low-thousands scale this serves.
#[derive(Debug, Clone)]
pub struct LocalStore {
    database: Database,
    threshold: f32,
}

impl LocalStore {
    #[inline]
    pub fn new(database: Database, threshold: f32) -> Self {
        Self {
            database,
            threshold,
        }
    }

    /// Rank every embedded chunk against `query`, returning at most `limit`
    /// matches at or above the configured threshold, best first.
    #[inline]
    pub async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredMatch>> {
        let rows = self.database.embedded_chunks().await?;
        debug!("Ranking {} embedded chunks locally", rows.len());

        let mut candidates = Vec::with_capacity(rows.len());
        for row in &rows {
            let Some(vector) = row.embedding_vector()? else {
                continue;
            };

            let payload = ChunkPayload::from_row(row)
                .to_value()
                .map_err(|e| KbError::VectorStore(e.to_string()))?;

            candidates.push(StoredVector {
                id: row.id,
                vector,
                payload,
            });
        }

        let mut matches = similarity::rank(query, &candidates, self.threshold)?;
        matches.truncate(limit);

        debug!("Local ranking produced {} match(es)", matches.len());
        Ok(matches)
    }
}
