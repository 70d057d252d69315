#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::config::QdrantConfig;
use crate::similarity::ScoredMatch;
use crate::store::VectorPoint;
use crate::{KbError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Named vector used for every point in the collection.
const VECTOR_NAME: &str = "embeddings";

/// Thin REST client over the external Qdrant vector database.
///
/// Ranking is delegated entirely to the service; the local similarity scorer
/// is never consulted for collections served from here.
#[derive(Debug, Clone)]
pub struct QdrantStore {
    endpoint: Url,
    api_key: String,
    collection: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct VectorParams {
    size: u32,
    distance: &'static str,
}

#[derive(Debug, Serialize)]
struct CreateCollectionRequest {
    vectors: BTreeMap<&'static str, VectorParams>,
}

#[derive(Debug, Serialize)]
struct UpsertPoint {
    id: i64,
    vector: BTreeMap<&'static str, Vec<f32>>,
    payload: Value,
}

#[derive(Debug, Serialize)]
struct UpsertRequest {
    points: Vec<UpsertPoint>,
}

#[derive(Debug, Serialize)]
struct NamedVector {
    name: &'static str,
    vector: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct SearchRequest {
    vector: NamedVector,
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Serialize)]
struct DeleteRequest {
    filter: Filter,
}

#[derive(Debug, Serialize)]
struct Filter {
    must: Vec<Condition>,
}

#[derive(Debug, Serialize)]
struct Condition {
    key: &'static str,
    #[serde(rename = "match")]
    match_value: MatchValue,
}

#[derive(Debug, Serialize)]
struct MatchValue {
    value: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct ExistsResult {
    exists: bool,
}

#[derive(Debug, Deserialize)]
struct UpdateResult {
    status: String,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    score: f32,
    payload: Option<Value>,
}

impl QdrantStore {
    #[inline]
    pub fn new(config: &QdrantConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|_| KbError::Config(format!("Invalid Qdrant endpoint: {}", config.endpoint)))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            endpoint,
            api_key: config.api_key.clone(),
            collection: config.collection.clone(),
            agent,
        })
    }

    /// Create the collection when it does not exist yet.
    #[inline]
    pub fn ensure_collection(&self, dimension: u32) -> Result<()> {
        if self.collection_exists()? {
            debug!("Collection '{}' already exists", self.collection);
            return Ok(());
        }

        self.create_collection(dimension)?;
        info!(
            "Created Qdrant collection '{}' ({} dimensions, cosine distance)",
            self.collection, dimension
        );
        Ok(())
    }

    #[inline]
    pub fn collection_exists(&self) -> Result<bool> {
        let url = self.collection_url("/exists")?;

        let response: ApiResponse<ExistsResult> = self.get_json(&url)?;
        Ok(response.result.exists)
    }

    #[inline]
    pub fn create_collection(&self, dimension: u32) -> Result<()> {
        let url = self.collection_url("")?;
        let request = CreateCollectionRequest {
            vectors: BTreeMap::from([(
                VECTOR_NAME,
                VectorParams {
                    size: dimension,
                    distance: "Cosine",
                },
            )]),
        };

        let _: ApiResponse<bool> = self.send_json("PUT", &url, &request)?;
        Ok(())
    }

    /// Insert or replace `points`, waiting for the write to be applied.
    #[inline]
    pub fn upsert_points(&self, points: &[VectorPoint]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let mut upsert_points = Vec::with_capacity(points.len());
        for point in points {
            upsert_points.push(UpsertPoint {
                id: point.id,
                vector: BTreeMap::from([(VECTOR_NAME, point.vector.clone())]),
                payload: point
                    .payload
                    .to_value()
                    .map_err(|e| KbError::VectorStore(e.to_string()))?,
            });
        }

        let url = self.collection_url("/points?wait=true")?;
        let request = UpsertRequest {
            points: upsert_points,
        };

        let response: ApiResponse<UpdateResult> = self.send_json("PUT", &url, &request)?;
        Self::expect_completed(&response.result.status, "upsert")?;

        debug!("Upserted {} point(s) to '{}'", points.len(), self.collection);
        Ok(())
    }

    /// Ranked payloads for `vector`, best first, scored by the service.
    #[inline]
    pub fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredMatch>> {
        let url = self.collection_url("/points/search")?;
        let request = SearchRequest {
            vector: NamedVector {
                name: VECTOR_NAME,
                vector: vector.to_vec(),
            },
            limit,
            with_payload: true,
        };

        let response: ApiResponse<Vec<SearchHit>> = self.send_json("POST", &url, &request)?;

        let matches = response
            .result
            .into_iter()
            .map(|hit| ScoredMatch {
                payload: hit.payload.unwrap_or(Value::Null),
                score: hit.score,
            })
            .collect::<Vec<_>>();

        debug!(
            "Qdrant search returned {} match(es) from '{}'",
            matches.len(),
            self.collection
        );
        Ok(matches)
    }

    /// Remove every point whose payload belongs to `source_id`.
    #[inline]
    pub fn delete_by_source(&self, source_id: &str) -> Result<()> {
        let url = self.collection_url("/points/delete?wait=true")?;
        let request = DeleteRequest {
            filter: Filter {
                must: vec![Condition {
                    key: "source_id",
                    match_value: MatchValue {
                        value: Value::String(source_id.to_string()),
                    },
                }],
            },
        };

        let response: ApiResponse<UpdateResult> = self.send_json("POST", &url, &request)?;
        Self::expect_completed(&response.result.status, "delete")?;

        debug!(
            "Deleted points for source '{}' from '{}'",
            source_id, self.collection
        );
        Ok(())
    }

    fn collection_url(&self, suffix: &str) -> Result<Url> {
        self.endpoint
            .join(&format!("collections/{}{}", self.collection, suffix))
            .map_err(|e| KbError::VectorStore(format!("Failed to build Qdrant URL: {e}")))
    }

    fn expect_completed(status: &str, operation: &str) -> Result<()> {
        if status == "completed" {
            Ok(())
        } else {
            Err(KbError::VectorStore(format!(
                "Qdrant {operation} finished with status '{status}'"
            )))
        }
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let mut request = self.agent.get(url.as_str());
        if !self.api_key.is_empty() {
            request = request.header("api-key", self.api_key.as_str());
        }

        let body = request
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| KbError::VectorStore(format!("Qdrant request failed: {e}")))?;

        serde_json::from_str(&body)
            .map_err(|e| KbError::VectorStore(format!("Failed to parse Qdrant response: {e}")))
    }

    fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        url: &Url,
        payload: &impl Serialize,
    ) -> Result<T> {
        let request_json = serde_json::to_string(payload)
            .map_err(|e| KbError::VectorStore(format!("Failed to serialize Qdrant request: {e}")))?;

        let mut request = match method {
            "PUT" => self.agent.put(url.as_str()),
            _ => self.agent.post(url.as_str()),
        }
        .header("Content-Type", "application/json");

        if !self.api_key.is_empty() {
            request = request.header("api-key", self.api_key.as_str());
        }

        let body = request
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| KbError::VectorStore(format!("Qdrant request failed: {e}")))?;

        serde_json::from_str(&body)
            .map_err(|e| KbError::VectorStore(format!("Failed to parse Qdrant response: {e}")))
    }
}
