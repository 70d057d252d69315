// Configuration management module
// TOML configuration management and settings

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_SIMILARITY_THRESHOLD,
    EmbeddingsConfig, IngestionConfig, QdrantConfig, SearchConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
