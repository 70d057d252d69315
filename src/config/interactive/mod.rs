#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};

use super::{Config, EmbeddingsConfig, QdrantConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("Knowledge Base Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Embedding API").bold().yellow());
    eprintln!("Configure the embedding service used to vectorize chunks and queries.");
    eprintln!();

    configure_embeddings(&mut config.embeddings)?;

    eprintln!();
    if Confirm::new()
        .with_prompt("Configure a Qdrant vector database? (searches fall back to local ranking without one)")
        .default(config.qdrant.is_some())
        .interact()?
    {
        let mut qdrant = config.qdrant.take().unwrap_or(QdrantConfig {
            endpoint: "http://localhost:6333".to_string(),
            api_key: String::new(),
            collection: "knowledge".to_string(),
        });
        configure_qdrant(&mut qdrant)?;
        config.qdrant = Some(qdrant);
    } else {
        config.qdrant = None;
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    eprintln!("{}", style("Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding API:").bold().yellow());
    eprintln!("  API base: {}", style(&config.embeddings.api_base).cyan());
    eprintln!(
        "  API key: {}",
        style(mask_api_key(&config.resolved_api_key())).cyan()
    );
    eprintln!("  Model: {}", style(&config.embeddings.model).cyan());
    eprintln!(
        "  Dimension: {}",
        style(config.embeddings.dimension).cyan()
    );
    eprintln!(
        "  Batch size: {}",
        style(config.embeddings.batch_size).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Ingestion:").bold().yellow());
    eprintln!(
        "  Chunk budget: {} tokens",
        style(config.ingestion.max_tokens).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Search:").bold().yellow());
    eprintln!(
        "  Similarity threshold: {}",
        style(config.search.similarity_threshold).cyan()
    );
    eprintln!(
        "  Max results: {}",
        style(config.search.max_results).cyan()
    );

    eprintln!();
    match &config.qdrant {
        Some(qdrant) => {
            eprintln!("{}", style("Qdrant:").bold().yellow());
            eprintln!("  Endpoint: {}", style(&qdrant.endpoint).cyan());
            eprintln!("  Collection: {}", style(&qdrant.collection).cyan());
        }
        None => {
            eprintln!(
                "{}",
                style("Qdrant: not configured (local ranking fallback)").dim()
            );
        }
    }

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

/// Redact an API key down to its first and last few characters.
pub(crate) fn mask_api_key(key: &str) -> String {
    if key.is_empty() {
        return "(not set)".to_string();
    }

    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }

    let prefix: String = chars.iter().take(4).collect();
    let suffix: String = chars.iter().rev().take(4).rev().collect();
    format!("{prefix}...{suffix}")
}

fn load_existing_config() -> Result<Config> {
    Config::load().map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            let mut config = Config::default();
            config.base_dir = Config::config_dir()?;
            Ok(config)
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_embeddings(embeddings: &mut EmbeddingsConfig) -> Result<()> {
    let api_base: String = Input::new()
        .with_prompt("Embedding API base URL")
        .default(embeddings.api_base.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if url::Url::parse(input).is_ok() {
                Ok(())
            } else {
                Err("Must be a valid URL")
            }
        })
        .interact_text()?;

    let api_key: String = Input::new()
        .with_prompt("API key (leave empty to use OPENAI_API_KEY)")
        .default(embeddings.api_key.clone())
        .allow_empty(true)
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(embeddings.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let dimension: u32 = Input::new()
        .with_prompt("Embedding dimension")
        .default(embeddings.dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(embeddings.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    embeddings.api_base = api_base;
    embeddings.api_key = api_key;
    embeddings.model = model;
    embeddings.dimension = dimension;
    embeddings.batch_size = batch_size;

    Ok(())
}

fn configure_qdrant(qdrant: &mut QdrantConfig) -> Result<()> {
    let endpoint: String = Input::new()
        .with_prompt("Qdrant endpoint")
        .default(qdrant.endpoint.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if url::Url::parse(input).is_ok() {
                Ok(())
            } else {
                Err("Must be a valid URL")
            }
        })
        .interact_text()?;

    let api_key: String = Input::new()
        .with_prompt("Qdrant API key (optional)")
        .default(qdrant.api_key.clone())
        .allow_empty(true)
        .interact_text()?;

    let collection: String = Input::new()
        .with_prompt("Collection name")
        .default(qdrant.collection.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Collection name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    qdrant.endpoint = endpoint;
    qdrant.api_key = api_key;
    qdrant.collection = collection;

    Ok(())
}
