
pub mod chunker;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

use crate::tokenizer::Tokenizer;

pub use chunker::{Chunker, DEFAULT_MAX_TOKENS};

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));

/// A document handed to the pipeline by the content provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// External identifier, when the provider has one.
    pub id: Option<String>,
    pub title: String,
    /// HTML or plain text.
    pub content: String,
}

/// One embeddable chunk produced from a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub source_id: Option<String>,
    pub source_title: String,
    pub chunk_text: String,
    /// Exact token length of the chunk text prefixed by the source title.
    /// Downstream budgeting depends on this being exact, never estimated.
    pub token_count: usize,
}

/// Turns source documents into persistable chunk records.
///
/// The tokenizer and chunker are injected so the vocabulary and chunking
/// policy are fixed for the lifetime of a pipeline run.
#[derive(Debug, Clone)]
pub struct ChunkAssembler {
    tokenizer: Tokenizer,
    chunker: Chunker,
    max_tokens: usize,
}

impl ChunkAssembler {
    #[inline]
    pub fn new(tokenizer: Tokenizer, chunker: Chunker, max_tokens: usize) -> Self {
        Self {
            tokenizer,
            chunker,
            max_tokens,
        }
    }

    /// Produce the chunk records for `source`.
    ///
    /// Documents within the token budget yield a single record whose text is
    /// the original, unstripped content; oversized documents are split on the
    /// stripped text and store the stripped segments. Stored content differs
    /// between the two branches, and existing consumers depend on both
    /// representations.
    #[inline]
    pub fn chunk_document(&self, source: &SourceDocument) -> Vec<ChunkRecord> {
        let plain_text = strip_tags(&source.content);
        let full_token_count = self.tokenizer.count_tokens(&plain_text);

        let records = if full_token_count <= self.max_tokens {
            let token_count = self.titled_token_count(&source.title, &plain_text);
            vec![ChunkRecord {
                source_id: source.id.clone(),
                source_title: source.title.clone(),
                chunk_text: source.content.clone(),
                token_count,
            }]
        } else {
            self.chunker
                .create_chunks(&plain_text, self.max_tokens)
                .into_iter()
                .map(|segment| {
                    let token_count = self.titled_token_count(&source.title, &segment);
                    ChunkRecord {
                        source_id: source.id.clone(),
                        source_title: source.title.clone(),
                        chunk_text: segment,
                        token_count,
                    }
                })
                .collect()
        };

        debug!(
            "Document '{}' ({} tokens stripped) produced {} chunk record(s)",
            source.title,
            full_token_count,
            records.len()
        );

        records
    }

    /// Token length of `text` prefixed by the document title, the quantity
    /// measured against model budgets downstream.
    fn titled_token_count(&self, title: &str, text: &str) -> usize {
        self.tokenizer.count_tokens(&format!("{title} {text}"))
    }
}

/// Remove HTML tags, keeping inner text.
#[inline]
pub fn strip_tags(content: &str) -> String {
    TAG_PATTERN.replace_all(content, "").into_owned()
}
