
use anyhow::{Context, Result};
use std::sync::Arc;
use tiktoken_rs::CoreBPE;
use tracing::debug;

/// Token counter over the fixed `cl100k_base` BPE vocabulary.
///
/// Counts are used for chunk budgeting only, never for inference. Every count
/// within a pipeline run goes through the same vocabulary so budgets stay
/// comparable across documents.
#[derive(Clone)]
pub struct Tokenizer {
    bpe: Arc<CoreBPE>,
}

impl Tokenizer {
    /// Load the `cl100k_base` vocabulary.
    ///
    /// A vocabulary that fails to load is fatal for ingestion: no token count
    /// can be trusted without it, so the error propagates to the caller
    /// instead of falling back to an estimate.
    #[inline]
    pub fn new() -> Result<Self> {
        let bpe =
            tiktoken_rs::cl100k_base().context("Failed to load cl100k_base BPE vocabulary")?;
        debug!("Loaded cl100k_base BPE vocabulary");

        Ok(Self { bpe: Arc::new(bpe) })
    }

    /// Number of tokens `text` encodes to.
    #[inline]
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Encode `text` into its token id sequence.
    #[inline]
    pub fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe.encode_ordinary(text)
    }
}

impl std::fmt::Debug for Tokenizer {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer")
            .field("vocabulary", &"cl100k_base")
            .finish()
    }
}
