use super::*;
use crate::database::sqlite::models::StorageBackend;
use chrono::Utc;
use serde_json::json;

fn row(id: i64, embedding: Option<&str>) -> ChunkRow {
    ChunkRow {
        id,
        source_id: Some("post-1".to_string()),
        source_title: "Title".to_string(),
        chunk_text: format!("chunk {id}"),
        token_count: 5,
        embedding: embedding.map(str::to_string),
        storage: StorageBackend::Local,
        created_date: Utc::now().naive_utc(),
    }
}

#[test]
fn points_skip_rows_without_embeddings() {
    let rows = vec![
        row(1, Some("[1.0, 0.0]")),
        row(2, None),
        row(3, Some("[0.0, 1.0]")),
    ];

    let points = points_from_rows(&rows).expect("conversion should succeed");

    assert_eq!(points.len(), 2);
    assert_eq!(points[0].id, 1);
    assert_eq!(points[0].vector, vec![1.0, 0.0]);
    assert_eq!(points[1].id, 3);
}

#[test]
fn malformed_embedding_fails_the_conversion() {
    let rows = vec![row(1, Some("oops"))];

    assert!(points_from_rows(&rows).is_err());
}

#[test]
fn payload_serializes_with_stable_keys() {
    let payload = ChunkPayload::from_row(&row(1, None));
    let value = payload.to_value().expect("serialization should succeed");

    assert_eq!(
        value,
        json!({
            "source_id": "post-1",
            "source_title": "Title",
            "chunk_text": "chunk 1",
            "token_count": 5,
        })
    );
}
