
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::ingestion::DEFAULT_MAX_TOKENS;

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1536;
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.4;

const CONFIG_FILE_NAME: &str = "config.toml";
const DATABASE_FILE_NAME: &str = "knowledge.db";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub search: SearchConfig,
    /// External vector database; the local brute-force fallback serves
    /// queries when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qdrant: Option<QdrantConfig>,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingsConfig {
    pub api_base: String,
    /// Falls back to the `OPENAI_API_KEY` environment variable when empty.
    pub api_key: String,
    pub model: String,
    pub dimension: u32,
    pub batch_size: u32,
}

impl Default for EmbeddingsConfig {
    #[inline]
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com".to_string(),
            api_key: String::new(),
            model: "text-embedding-3-small".to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            batch_size: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IngestionConfig {
    /// Token budget for a single chunk.
    pub max_tokens: usize,
}

impl Default for IngestionConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Acceptance cutoff for locally ranked matches, in [-1, 1].
    pub similarity_threshold: f32,
    pub max_results: usize,
}

impl Default for SearchConfig {
    #[inline]
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_results: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QdrantConfig {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_collection() -> String {
    "knowledge".to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid chunk budget: {0} (must be between 1 and 8191 tokens)")]
    InvalidMaxTokens(usize),
    #[error("Invalid similarity threshold: {0} (must be within [-1, 1])")]
    InvalidSimilarityThreshold(f32),
    #[error("Invalid max results: {0} (must be between 1 and 100)")]
    InvalidMaxResults(usize),
    #[error("Invalid collection name: {0} (cannot be empty)")]
    InvalidCollection(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            embeddings: EmbeddingsConfig::default(),
            ingestion: IngestionConfig::default(),
            search: SearchConfig::default(),
            qdrant: None,
            base_dir: PathBuf::new(),
        }
    }
}

impl Config {
    /// Platform configuration directory for this application.
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("chat-kb"))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load configuration from the platform config directory.
    #[inline]
    pub fn load() -> Result<Self> {
        let config_dir = Self::config_dir().context("Failed to resolve config directory")?;
        Self::load_from(config_dir)
    }

    /// Load configuration from `config_dir`, falling back to defaults when no
    /// file exists yet.
    #[inline]
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            let mut config = Self::default();
            config.base_dir = config_dir.as_ref().to_path_buf();
            return Ok(config);
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE_NAME)
    }

    #[inline]
    pub fn database_path(&self) -> PathBuf {
        self.base_dir.join(DATABASE_FILE_NAME)
    }

    /// The embeddings endpoint resolved from the configured API base.
    #[inline]
    pub fn embeddings_url(&self) -> Result<Url, ConfigError> {
        let base = Url::parse(&self.embeddings.api_base)
            .map_err(|_| ConfigError::InvalidUrl(self.embeddings.api_base.clone()))?;
        base.join("/v1/embeddings")
            .map_err(|_| ConfigError::InvalidUrl(self.embeddings.api_base.clone()))
    }

    /// API key from the config file, or the `OPENAI_API_KEY` environment
    /// variable when the file leaves it empty.
    #[inline]
    pub fn resolved_api_key(&self) -> String {
        if self.embeddings.api_key.is_empty() {
            std::env::var("OPENAI_API_KEY").unwrap_or_default()
        } else {
            self.embeddings.api_key.clone()
        }
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embeddings.validate()?;

        if self.ingestion.max_tokens == 0 || self.ingestion.max_tokens > 8191 {
            return Err(ConfigError::InvalidMaxTokens(self.ingestion.max_tokens));
        }

        if !(-1.0..=1.0).contains(&self.search.similarity_threshold) {
            return Err(ConfigError::InvalidSimilarityThreshold(
                self.search.similarity_threshold,
            ));
        }

        if self.search.max_results == 0 || self.search.max_results > 100 {
            return Err(ConfigError::InvalidMaxResults(self.search.max_results));
        }

        if let Some(qdrant) = &self.qdrant {
            qdrant.validate()?;
        }

        Ok(())
    }
}

impl EmbeddingsConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if Url::parse(&self.api_base).is_err() {
            return Err(ConfigError::InvalidUrl(self.api_base.clone()));
        }

        if self.model.is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if self.dimension < 64 || self.dimension > 4096 {
            return Err(ConfigError::InvalidEmbeddingDimension(self.dimension));
        }

        Ok(())
    }
}

impl QdrantConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if Url::parse(&self.endpoint).is_err() {
            return Err(ConfigError::InvalidUrl(self.endpoint.clone()));
        }

        if self.collection.is_empty() {
            return Err(ConfigError::InvalidCollection(self.collection.clone()));
        }

        Ok(())
    }
}
