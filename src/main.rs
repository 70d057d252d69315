use anyhow::Result;
use chat_kb::commands;
use chat_kb::config::{run_interactive_config, show_config};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chat-kb")]
#[command(about = "Knowledge-base ingestion and similarity search for chat assistants")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding service and vector store
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ingest a file, a directory of files, or standard input ("-")
    Ingest {
        /// Path to a .txt/.md/.html file, a directory, or "-" for stdin
        path: PathBuf,
        /// Title stored with the document (defaults to the file name)
        #[arg(long)]
        title: Option<String>,
        /// Stable identifier used to supersede earlier ingests of the same source
        #[arg(long)]
        source_id: Option<String>,
    },
    /// Search the knowledge base for similar chunks
    Search {
        /// Query text
        query: String,
        /// Maximum number of matches to return
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List all stored chunks
    List,
    /// Delete every chunk belonging to a source
    Delete {
        /// Source identifier given at ingest time
        source_id: String,
    },
    /// Push locally stored vectors to the configured Qdrant instance
    Migrate,
    /// Show knowledge base and embedding service status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ingest {
            path,
            title,
            source_id,
        } => {
            commands::ingest(path, title, source_id).await?;
        }
        Commands::Search { query, limit } => {
            commands::search(query, limit).await?;
        }
        Commands::List => {
            commands::list().await?;
        }
        Commands::Delete { source_id } => {
            commands::delete(source_id).await?;
        }
        Commands::Migrate => {
            commands::migrate().await?;
        }
        Commands::Status => {
            commands::status().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["chat-kb", "list"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::List);
        }
    }

    #[test]
    fn ingest_command_with_path() {
        let cli = Cli::try_parse_from(["chat-kb", "ingest", "notes.md"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ingest { path, title, .. } = parsed.command {
                assert_eq!(path, PathBuf::from("notes.md"));
                assert_eq!(title, None);
            }
        }
    }

    #[test]
    fn ingest_command_with_metadata() {
        let cli = Cli::try_parse_from([
            "chat-kb",
            "ingest",
            "notes.md",
            "--title",
            "Release Notes",
            "--source-id",
            "notes-1",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ingest {
                path,
                title,
                source_id,
            } = parsed.command
            {
                assert_eq!(path, PathBuf::from("notes.md"));
                assert_eq!(title, Some("Release Notes".to_string()));
                assert_eq!(source_id, Some("notes-1".to_string()));
            }
        }
    }

    #[test]
    fn search_command_with_limit() {
        let cli = Cli::try_parse_from(["chat-kb", "search", "how do refunds work", "--limit", "3"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Search { query, limit } = parsed.command {
                assert_eq!(query, "how do refunds work");
                assert_eq!(limit, Some(3));
            }
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["chat-kb", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["chat-kb", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["chat-kb", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
