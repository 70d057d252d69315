
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimilarityError {
    #[error("Vector dimensions do not match: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// A vector read from storage together with its metadata payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVector {
    pub id: i64,
    pub vector: Vec<f32>,
    pub payload: Value,
}

/// One ranked search hit. Produced per query, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub payload: Value,
    pub score: f32,
}

/// Cosine similarity between two vectors of identical dimensionality.
///
/// Mismatched dimensions are a programming error and fail loudly. A
/// zero-magnitude vector has no direction, so any comparison involving one
/// scores `0.0`, including against another zero vector.
#[inline]
pub fn cosine_similarity(vector_a: &[f32], vector_b: &[f32]) -> Result<f32, SimilarityError> {
    if vector_a.len() != vector_b.len() {
        return Err(SimilarityError::DimensionMismatch {
            left: vector_a.len(),
            right: vector_b.len(),
        });
    }

    let dot_product = dot(vector_a, vector_b);
    let magnitude_a = magnitude(vector_a);
    let magnitude_b = magnitude(vector_b);

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (magnitude_a * magnitude_b))
}

fn dot(vector_a: &[f32], vector_b: &[f32]) -> f32 {
    vector_a
        .iter()
        .zip(vector_b)
        .map(|(a, b)| a * b)
        .sum()
}

fn magnitude(vector: &[f32]) -> f32 {
    dot(vector, vector).sqrt()
}

/// Rank `candidates` against `query`, keeping scores at or above `threshold`.
///
/// The sort is stable and descending: equal scores keep their original
/// candidate order. This is the brute-force fallback used when no external
/// vector database is configured; cost is linear in the candidate count.
#[inline]
pub fn rank(
    query: &[f32],
    candidates: &[StoredVector],
    threshold: f32,
) -> Result<Vec<ScoredMatch>, SimilarityError> {
    let mut matches = Vec::new();

    for candidate in candidates {
        let score = cosine_similarity(query, &candidate.vector)?;
        trace!("Candidate {} scored {score}", candidate.id);

        if score >= threshold {
            matches.push(ScoredMatch {
                payload: candidate.payload.clone(),
                score,
            });
        }
    }

    matches.sort_by(|a, b| b.score.total_cmp(&a.score));

    Ok(matches)
}
