
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

use crate::config::Config;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint.
///
/// The pipeline treats the service as opaque: text in, fixed-dimension
/// vectors out. Transport failures and server errors are retried with
/// exponential backoff; client errors fail immediately.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    embeddings_url: Url,
    models_url: Url,
    api_key: String,
    model: String,
    dimension: u32,
    batch_size: u32,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
    /// Only the `text-embedding-3-*` family accepts an explicit dimension.
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub id: String,
}

impl OpenAIClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let embeddings_url = config
            .embeddings_url()
            .context("Failed to build embeddings URL from config")?;

        let models_url = Url::parse(&config.embeddings.api_base)
            .and_then(|base| base.join("/v1/models"))
            .context("Failed to build models URL from config")?;

        let api_key = config.resolved_api_key();
        if api_key.is_empty() {
            warn!("No API key configured; requests will be sent unauthenticated");
        }

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            embeddings_url,
            models_url,
            api_key,
            model: config.embeddings.model.clone(),
            dimension: config.embeddings.dimension,
            batch_size: config.embeddings.batch_size,
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Check that the service is reachable and the configured model exists.
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check against {}", self.models_url);

        let models = self.list_models().context("Failed to list models")?;

        if models.iter().any(|m| m.id == self.model) {
            debug!("Model {} is available", self.model);
            Ok(())
        } else {
            warn!("Model {} not found in the service's model list", self.model);
            Err(anyhow::anyhow!(
                "Model '{}' is not available on the embedding service",
                self.model
            ))
        }
    }

    /// Check that the service answers at all.
    #[inline]
    pub fn ping(&self) -> Result<()> {
        debug!("Pinging embedding service at {}", self.models_url);

        self.make_request_with_retry(|| {
            let mut request = self.agent.get(self.models_url.as_str());
            if !self.api_key.is_empty() {
                request = request.header("Authorization", format!("Bearer {}", self.api_key));
            }
            request
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .context("Failed to ping embedding service")?;

        debug!("Embedding service ping successful");
        Ok(())
    }

    /// List the models the service advertises.
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response_text = self
            .make_request_with_retry(|| {
                let mut request = self.agent.get(self.models_url.as_str());
                if !self.api_key.is_empty() {
                    request = request.header("Authorization", format!("Bearer {}", self.api_key));
                }
                request
                    .call()
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to fetch models")?;

        let models_response: ModelsResponse =
            serde_json::from_str(&response_text).context("Failed to parse models response")?;

        debug!("Found {} models", models_response.data.len());
        Ok(models_response.data)
    }

    /// Generate the embedding vector for a single text input.
    #[inline]
    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_single_batch(&[text.to_string()])?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Embedding service returned no vector"))
    }

    /// Generate embedding vectors for `texts`, in order.
    ///
    /// Inputs are sent in batches so a large document does not exceed request
    /// limits on the service side.
    #[inline]
    pub fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size as usize) {
            let batch_vectors = self
                .embed_single_batch(batch)
                .with_context(|| format!("Failed to embed batch of {} texts", batch.len()))?;
            vectors.extend(batch_vectors);
        }

        debug!("Generated {} embeddings total", vectors.len());
        Ok(vectors)
    }

    fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
            dimensions: self
                .model
                .starts_with("text-embedding-3")
                .then_some(self.dimension),
        };

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;

        let response_text = self
            .make_request_with_retry(|| {
                let mut request = self
                    .agent
                    .post(self.embeddings_url.as_str())
                    .header("Content-Type", "application/json");
                if !self.api_key.is_empty() {
                    request = request.header("Authorization", format!("Bearer {}", self.api_key));
                }
                request
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to generate embeddings")?;

        let response: EmbeddingResponse =
            serde_json::from_str(&response_text).context("Failed to parse embedding response")?;

        if response.data.len() != texts.len() {
            return Err(anyhow::anyhow!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.data.len()
            ));
        }

        // The service may return entries out of order; the index field is
        // authoritative.
        let mut data = response.data;
        data.sort_by_key(|entry| entry.index);

        for entry in &data {
            if entry.embedding.len() != self.dimension as usize {
                return Err(anyhow::anyhow!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    self.dimension,
                    entry.embedding.len()
                ));
            }
        }

        Ok(data.into_iter().map(|entry| entry.embedding).collect())
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 {
                                warn!(
                                    "Server error (status {}), attempt {}/{}",
                                    status, attempt, self.retry_attempts
                                );
                                true
                            } else {
                                warn!("Client error (status {}), not retrying", status);
                                return Err(anyhow::anyhow!("Client error: HTTP {}", status));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => {
                            warn!("Non-retryable error: {}", error);
                            false
                        }
                    };

                    if !should_retry {
                        return Err(anyhow::anyhow!("Non-retryable error: {}", error));
                    }

                    last_error = Some(anyhow::anyhow!("Request error: {}", error));

                    if attempt < self.retry_attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        let delay = Duration::from_millis(delay_ms);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!(
            "All retry attempts failed for request to {}",
            self.embeddings_url
        );

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request failed after retries")))
    }
}
