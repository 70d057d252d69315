use super::*;
use crate::store::ChunkPayload;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_store(server_uri: &str) -> QdrantStore {
    QdrantStore::new(&QdrantConfig {
        endpoint: server_uri.to_string(),
        api_key: "qdrant-secret".to_string(),
        collection: "knowledge".to_string(),
    })
    .expect("store should build")
}

fn sample_point(id: i64) -> VectorPoint {
    VectorPoint {
        id,
        vector: vec![0.1, 0.2, 0.3],
        payload: ChunkPayload {
            source_id: Some("post-1".to_string()),
            source_title: "Title".to_string(),
            chunk_text: format!("chunk {id}"),
            token_count: 5,
        },
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn ensure_collection_creates_when_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/knowledge/exists"))
        .and(header("api-key", "qdrant-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "exists": false }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/collections/knowledge"))
        .and(body_partial_json(json!({
            "vectors": { "embeddings": { "size": 1536, "distance": "Cosine" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": true })))
        .expect(1)
        .mount(&server)
        .await;

    let store = create_store(&server.uri());

    store
        .ensure_collection(1536)
        .expect("collection setup should succeed");
}

#[tokio::test(flavor = "multi_thread")]
async fn ensure_collection_skips_when_present() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/knowledge/exists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "exists": true }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = create_store(&server.uri());

    store
        .ensure_collection(1536)
        .expect("collection check should succeed");
}

#[tokio::test(flavor = "multi_thread")]
async fn upsert_sends_named_vectors_and_waits() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/collections/knowledge/points"))
        .and(query_param("wait", "true"))
        .and(body_partial_json(json!({
            "points": [{
                "id": 7,
                "vector": { "embeddings": [0.1, 0.2, 0.3] },
                "payload": {
                    "source_id": "post-1",
                    "source_title": "Title",
                    "chunk_text": "chunk 7",
                    "token_count": 5,
                }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "operation_id": 0, "status": "completed" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = create_store(&server.uri());

    store
        .upsert_points(&[sample_point(7)])
        .expect("upsert should succeed");
}

#[tokio::test(flavor = "multi_thread")]
async fn upsert_of_nothing_makes_no_request() {
    let server = MockServer::start().await;

    let store = create_store(&server.uri());

    store.upsert_points(&[]).expect("no-op upsert succeeds");
}

#[tokio::test(flavor = "multi_thread")]
async fn incomplete_upsert_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/collections/knowledge/points"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "operation_id": 0, "status": "acknowledged" }
        })))
        .mount(&server)
        .await;

    let store = create_store(&server.uri());

    assert!(store.upsert_points(&[sample_point(1)]).is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn search_returns_service_ranked_payloads() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections/knowledge/points/search"))
        .and(body_partial_json(json!({
            "vector": { "name": "embeddings", "vector": [1.0, 0.0, 0.0] },
            "limit": 10,
            "with_payload": true,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [
                { "id": 1, "score": 0.91, "payload": { "chunk_text": "best" } },
                { "id": 2, "score": 0.55, "payload": { "chunk_text": "second" } },
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = create_store(&server.uri());

    let matches = store
        .search(&[1.0, 0.0, 0.0], 10)
        .expect("search should succeed");

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].payload["chunk_text"], "best");
    assert!((matches[0].score - 0.91).abs() < 1e-6);
    assert_eq!(matches[1].payload["chunk_text"], "second");
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_filters_on_the_source_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections/knowledge/points/delete"))
        .and(query_param("wait", "true"))
        .and(body_partial_json(json!({
            "filter": { "must": [{ "key": "source_id", "match": { "value": "post-1" } }] }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "operation_id": 1, "status": "completed" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = create_store(&server.uri());

    store
        .delete_by_source("post-1")
        .expect("delete should succeed");
}

#[tokio::test(flavor = "multi_thread")]
async fn service_errors_surface_as_store_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/knowledge/exists"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let store = create_store(&server.uri());

    let result = store.collection_exists();

    assert!(matches!(result, Err(KbError::VectorStore(_))));
}
