use anyhow::{Context, Result};
use console::style;
use indicatif::ProgressBar;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::ingestion::SourceDocument;
use crate::pipeline::KnowledgePipeline;

/// Ingest a file, a directory of files, or standard input (`-`).
#[inline]
pub async fn ingest(
    path: PathBuf,
    title: Option<String>,
    source_id: Option<String>,
) -> Result<()> {
    let config = Config::load()?;
    let pipeline = KnowledgePipeline::new(&config).await?;

    if path.as_os_str() == "-" {
        let document = read_stdin_document(title, source_id)?;
        ingest_one(&pipeline, &document).await?;
        return Ok(());
    }

    if path.is_dir() {
        let documents = collect_directory_documents(&path)?;
        if documents.is_empty() {
            println!("No ingestable files (.txt, .md, .html) found in {}", path.display());
            return Ok(());
        }

        let progress = ProgressBar::new(documents.len() as u64);
        let mut total_chunks = 0;
        for document in &documents {
            progress.set_message(document.title.clone());
            let report = pipeline.ingest(document).await?;
            total_chunks += report.chunks_created;
            progress.inc(1);
        }
        progress.finish_and_clear();

        println!(
            "Ingested {} document(s) into {} chunk(s)",
            documents.len(),
            total_chunks
        );
        return Ok(());
    }

    let document = read_file_document(&path, title, source_id)?;
    ingest_one(&pipeline, &document).await?;
    Ok(())
}

async fn ingest_one(pipeline: &KnowledgePipeline, document: &SourceDocument) -> Result<()> {
    info!("Ingesting document '{}'", document.title);

    let report = pipeline.ingest(document).await?;

    println!(
        "Ingested '{}': {} chunk(s), {} token(s)",
        style(&document.title).bold(),
        report.chunks_created,
        report.total_tokens
    );
    if report.chunks_replaced > 0 {
        println!("Replaced {} previous chunk(s)", report.chunks_replaced);
    }

    Ok(())
}

fn read_file_document(
    path: &Path,
    title: Option<String>,
    source_id: Option<String>,
) -> Result<SourceDocument> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_string());

    Ok(SourceDocument {
        id: Some(source_id.unwrap_or_else(|| stem.clone())),
        title: title.unwrap_or(stem),
        content,
    })
}

fn read_stdin_document(
    title: Option<String>,
    source_id: Option<String>,
) -> Result<SourceDocument> {
    let mut content = String::new();
    std::io::stdin()
        .read_to_string(&mut content)
        .context("Failed to read from standard input")?;

    Ok(SourceDocument {
        id: Some(source_id.unwrap_or_else(|| Uuid::new_v4().to_string())),
        title: title.unwrap_or_else(|| "stdin".to_string()),
        content,
    })
}

fn collect_directory_documents(dir: &Path) -> Result<Vec<SourceDocument>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_ingestable_extension(path))
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|path| read_file_document(path, None, None))
        .collect()
}

fn has_ingestable_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ext.eq_ignore_ascii_case("txt")
                || ext.eq_ignore_ascii_case("md")
                || ext.eq_ignore_ascii_case("html")
                || ext.eq_ignore_ascii_case("htm")
        })
}

/// Query the knowledge base and print the ranked matches.
#[inline]
pub async fn search(query: String, limit: Option<usize>) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(limit) = limit {
        config.search.max_results = limit;
    }

    let pipeline = KnowledgePipeline::new(&config).await?;
    let matches = pipeline.search(&query).await?;

    if matches.is_empty() {
        println!("No matches found.");
        return Ok(());
    }

    for (rank, result) in matches.iter().enumerate() {
        let title = result.payload["source_title"].as_str().unwrap_or("(untitled)");
        let text = result.payload["chunk_text"].as_str().unwrap_or("");
        let preview: String = text.chars().take(160).collect();

        println!(
            "{} {} {}",
            style(format!("{}.", rank + 1)).bold(),
            style(title).cyan(),
            style(format!("(score {:.4})", result.score)).dim()
        );
        println!("   {preview}");
    }

    Ok(())
}

/// List every stored chunk with its source and storage backend.
#[inline]
pub async fn list() -> Result<()> {
    let config = Config::load()?;
    let pipeline = KnowledgePipeline::new(&config).await?;

    let rows = pipeline.list_chunks().await?;
    if rows.is_empty() {
        println!("The knowledge base is empty.");
        return Ok(());
    }

    for row in &rows {
        let source = row.source_id.as_deref().unwrap_or("-");
        println!(
            "{:>6}  {:<24} {:>6} tokens  {:<7} {}",
            row.id,
            source,
            row.token_count,
            row.storage.to_string(),
            style(&row.source_title).cyan()
        );
    }
    println!("{} chunk(s) total", rows.len());

    Ok(())
}

/// Remove every chunk belonging to a source.
#[inline]
pub async fn delete(source_id: String) -> Result<()> {
    let config = Config::load()?;
    let pipeline = KnowledgePipeline::new(&config).await?;

    let deleted = pipeline.delete_source(&source_id).await?;

    if deleted == 0 {
        println!("No chunks found for source '{source_id}'");
    } else {
        println!("Deleted {deleted} chunk(s) for source '{source_id}'");
    }

    Ok(())
}

/// Push locally stored vectors to the configured Qdrant instance.
#[inline]
pub async fn migrate() -> Result<()> {
    let config = Config::load()?;
    let pipeline = KnowledgePipeline::new(&config).await?;

    let migrated = pipeline.migrate_local_data().await?;

    println!("Migrated {migrated} chunk(s) to the external vector store");
    Ok(())
}

/// Show what the knowledge base holds and where vectors are served from.
#[inline]
pub async fn status() -> Result<()> {
    let config = Config::load()?;
    let pipeline = KnowledgePipeline::new(&config).await?;

    let status = pipeline.status().await?;

    println!("{}", style("Knowledge base status").bold().cyan());
    println!("  Total chunks: {}", status.total_chunks);
    println!("  Local chunks: {}", status.local_chunks);
    println!("  Migrated chunks: {}", status.migrated_chunks);
    println!(
        "  Search backend: {}",
        if status.external_store_configured {
            "qdrant"
        } else {
            "local (brute-force)"
        }
    );

    match pipeline.health_check() {
        Ok(()) => println!("  Embedding service: {}", style("reachable").green()),
        Err(e) => println!("  Embedding service: {} ({e})", style("unreachable").red()),
    }

    Ok(())
}
