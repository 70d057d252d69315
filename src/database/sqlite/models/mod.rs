#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

/// A persisted chunk record together with its embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ChunkRow {
    pub id: i64,
    pub source_id: Option<String>,
    pub source_title: String,
    pub chunk_text: String,
    pub token_count: i64,
    /// JSON-encoded `Vec<f32>`; absent until the embedding service has
    /// vectorized the chunk.
    pub embedding: Option<String>,
    pub storage: StorageBackend,
    pub created_date: NaiveDateTime,
}

/// Which backend currently serves a row's vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    Qdrant,
}

impl std::fmt::Display for StorageBackend {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            StorageBackend::Local => write!(f, "local"),
            StorageBackend::Qdrant => write!(f, "qdrant"),
        }
    }
}

/// A chunk row about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChunkRow {
    pub source_id: Option<String>,
    pub source_title: String,
    pub chunk_text: String,
    pub token_count: i64,
    pub embedding: Option<Vec<f32>>,
}

impl ChunkRow {
    /// Decode the stored embedding vector, if any.
    #[inline]
    pub fn embedding_vector(&self) -> Result<Option<Vec<f32>>> {
        self.embedding
            .as_deref()
            .map(|json| {
                serde_json::from_str(json).with_context(|| {
                    format!("Failed to decode embedding for chunk row {}", self.id)
                })
            })
            .transpose()
    }

    #[inline]
    pub fn is_migrated(&self) -> bool {
        self.storage == StorageBackend::Qdrant
    }
}

impl NewChunkRow {
    /// JSON encoding of the embedding as stored in the table.
    #[inline]
    pub fn embedding_json(&self) -> Result<Option<String>> {
        self.embedding
            .as_ref()
            .map(|vector| serde_json::to_string(vector).context("Failed to encode embedding"))
            .transpose()
    }
}
