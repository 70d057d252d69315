// Store module
// Vector backends for embedded chunks: the external Qdrant service and the
// local brute-force fallback

#[cfg(test)]
mod tests;

pub mod local;
pub mod qdrant;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::sqlite::models::ChunkRow;

pub use local::LocalStore;
pub use qdrant::QdrantStore;

/// Metadata stored alongside each vector, identical across backends so
/// search results render the same regardless of where they were served from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub source_id: Option<String>,
    pub source_title: String,
    pub chunk_text: String,
    pub token_count: i64,
}

/// A vector plus payload addressed by its chunk row id.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPoint {
    pub id: i64,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

impl ChunkPayload {
    #[inline]
    pub fn from_row(row: &ChunkRow) -> Self {
        Self {
            source_id: row.source_id.clone(),
            source_title: row.source_title.clone(),
            chunk_text: row.chunk_text.clone(),
            token_count: row.token_count,
        }
    }

    #[inline]
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Convert embedded rows into points for a vector backend.
///
/// Rows whose embedding has not been generated yet are skipped.
#[inline]
pub fn points_from_rows(rows: &[ChunkRow]) -> Result<Vec<VectorPoint>> {
    let mut points = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(vector) = row.embedding_vector()? else {
            continue;
        };

        points.push(VectorPoint {
            id: row.id,
            vector,
            payload: ChunkPayload::from_row(row),
        });
    }

    Ok(points)
}
