use super::*;
use chrono::Utc;

fn sample_row(embedding: Option<String>) -> ChunkRow {
    ChunkRow {
        id: 1,
        source_id: Some("post-9".to_string()),
        source_title: "Sample".to_string(),
        chunk_text: "Sample text.".to_string(),
        token_count: 4,
        embedding,
        storage: StorageBackend::Local,
        created_date: Utc::now().naive_utc(),
    }
}

#[test]
fn embedding_round_trips_through_json() {
    let new_row = NewChunkRow {
        source_id: None,
        source_title: "Sample".to_string(),
        chunk_text: "Sample text.".to_string(),
        token_count: 4,
        embedding: Some(vec![0.25, -1.5, 3.0]),
    };

    let json = new_row
        .embedding_json()
        .expect("encoding should succeed")
        .expect("embedding present");

    let row = sample_row(Some(json));
    let decoded = row
        .embedding_vector()
        .expect("decoding should succeed")
        .expect("embedding present");

    assert_eq!(decoded, vec![0.25, -1.5, 3.0]);
}

#[test]
fn missing_embedding_decodes_to_none() {
    let row = sample_row(None);

    assert!(
        row.embedding_vector()
            .expect("decoding should succeed")
            .is_none()
    );
}

#[test]
fn malformed_embedding_is_an_error() {
    let row = sample_row(Some("not json".to_string()));

    assert!(row.embedding_vector().is_err());
}

#[test]
fn storage_backend_display() {
    assert_eq!(StorageBackend::Local.to_string(), "local");
    assert_eq!(StorageBackend::Qdrant.to_string(), "qdrant");
}

#[test]
fn migrated_flag_follows_storage() {
    let mut row = sample_row(None);
    assert!(!row.is_migrated());

    row.storage = StorageBackend::Qdrant;
    assert!(row.is_migrated());
}
