#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end tests for the ingestion pipeline and the local retrieval
// fallback, with the embedding service mocked at the HTTP level.

use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use chat_kb::config::Config;
use chat_kb::ingestion::SourceDocument;
use chat_kb::pipeline::KnowledgePipeline;
use chat_kb::tokenizer::Tokenizer;

/// Deterministic stand-in for the embedding service: every input text maps
/// to a unit vector derived from its bytes, so equal texts embed equally.
struct DeterministicEmbeddings;

impl Respond for DeterministicEmbeddings {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).expect("request body is JSON");
        let inputs = body["input"].as_array().expect("input is an array");

        let data: Vec<Value> = inputs
            .iter()
            .enumerate()
            .map(|(index, input)| {
                let text = input.as_str().expect("input is a string");
                let sum: u32 = text.bytes().map(u32::from).sum();
                let angle = f64::from(sum % 359).to_radians();
                json!({
                    "embedding": [angle.cos(), angle.sin(), 0.0],
                    "index": index,
                })
            })
            .collect();

        ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
    }
}

async fn create_test_setup() -> (MockServer, TempDir, KnowledgePipeline) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(DeterministicEmbeddings)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("can create temp dir");
    let mut config = Config::default();
    config.base_dir = temp_dir.path().to_path_buf();
    config.embeddings.api_base = server.uri();
    config.embeddings.api_key = "sk-test".to_string();
    config.embeddings.dimension = 3;

    let pipeline = KnowledgePipeline::new(&config)
        .await
        .expect("can build pipeline");

    (server, temp_dir, pipeline)
}

fn long_document() -> SourceDocument {
    SourceDocument {
        id: Some("handbook".to_string()),
        title: "Support Handbook".to_string(),
        content: "<p>Refunds are processed within five business days. </p>".repeat(300),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn long_document_is_chunked_embedded_and_persisted() {
    let (_server, _temp_dir, pipeline) = create_test_setup().await;

    let report = pipeline
        .ingest(&long_document())
        .await
        .expect("ingest should succeed");

    assert!(
        report.chunks_created >= 3,
        "a multi-thousand-token document should split into several chunks"
    );

    // Every persisted row carries the exact title-prefixed token count.
    let tokenizer = Tokenizer::new().expect("can load vocabulary");
    let rows = pipeline.list_chunks().await.expect("can list chunks");
    assert_eq!(rows.len(), report.chunks_created);
    for row in &rows {
        let expected =
            tokenizer.count_tokens(&format!("Support Handbook {}", row.chunk_text)) as i64;
        assert_eq!(row.token_count, expected);
        assert!(row.embedding.is_some());
        assert!(!row.chunk_text.contains('<'), "segments are stored stripped");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn query_retrieves_the_matching_chunk() {
    let (_server, _temp_dir, pipeline) = create_test_setup().await;

    pipeline
        .ingest(&SourceDocument {
            id: Some("refunds".to_string()),
            title: "Refund Policy".to_string(),
            content: "Refunds are processed within five business days.".to_string(),
        })
        .await
        .expect("ingest should succeed");
    pipeline
        .ingest(&SourceDocument {
            id: Some("shipping".to_string()),
            title: "Shipping Policy".to_string(),
            content: "Orders ship from our warehouse within one day.".to_string(),
        })
        .await
        .expect("ingest should succeed");

    // The mocked embedder maps identical text to identical vectors, so the
    // stored chunk text is the best possible query.
    let matches = pipeline
        .search("Refunds are processed within five business days.")
        .await
        .expect("search should succeed");

    assert!(!matches.is_empty());
    assert_eq!(matches[0].payload["source_title"], "Refund Policy");
    assert!((matches[0].score - 1.0).abs() < 1e-5);
}

#[tokio::test(flavor = "multi_thread")]
async fn deleting_a_source_removes_its_matches() {
    let (_server, _temp_dir, pipeline) = create_test_setup().await;

    pipeline
        .ingest(&SourceDocument {
            id: Some("temp".to_string()),
            title: "Temporary".to_string(),
            content: "Ephemeral content that will be removed.".to_string(),
        })
        .await
        .expect("ingest should succeed");

    let deleted = pipeline
        .delete_source("temp")
        .await
        .expect("delete should succeed");
    assert_eq!(deleted, 1);

    let matches = pipeline
        .search("Ephemeral content that will be removed.")
        .await
        .expect("search should succeed");
    assert!(matches.is_empty());

    let status = pipeline.status().await.expect("status should succeed");
    assert_eq!(status.total_chunks, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn short_document_keeps_its_original_markup() {
    let (_server, _temp_dir, pipeline) = create_test_setup().await;

    pipeline
        .ingest(&SourceDocument {
            id: Some("styled".to_string()),
            title: "Styled".to_string(),
            content: "<p>Short and <em>styled</em>.</p>".to_string(),
        })
        .await
        .expect("ingest should succeed");

    let rows = pipeline.list_chunks().await.expect("can list chunks");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].chunk_text, "<p>Short and <em>styled</em>.</p>");
}
