
use itertools::Itertools;
use tracing::debug;

use crate::tokenizer::Tokenizer;

/// Default token budget for a single chunk.
pub const DEFAULT_MAX_TOKENS: usize = 1000;

/// Sentence delimiter used for both splitting and re-joining.
///
/// Splitting on the literal `". "` is a naive heuristic that ignores
/// abbreviations and quoting. Previously ingested chunks were produced by
/// this exact split, so it must not be swapped for a smarter segmenter.
const SENTENCE_DELIMITER: &str = ". ";

/// Splits document text into token-budgeted chunks at sentence boundaries.
#[derive(Debug, Clone)]
pub struct Chunker {
    tokenizer: Tokenizer,
}

/// Fold state carried across candidate sentences: completed chunks, the
/// sentences accumulated for the chunk in progress, and its running token
/// total.
#[derive(Debug, Default)]
struct ChunkState {
    chunks: Vec<String>,
    accumulator: Vec<String>,
    running_total: usize,
}

impl ChunkState {
    /// Join the accumulated sentences into a completed chunk and reset.
    fn flush(&mut self) {
        let chunk = format!("{}.", self.accumulator.iter().join(SENTENCE_DELIMITER));
        self.chunks.push(chunk);
        self.accumulator.clear();
        self.running_total = 0;
    }
}

impl Chunker {
    #[inline]
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }

    /// Split `text` into chunks holding at most `max_tokens` tokens each.
    ///
    /// Sentences accumulate greedily until the next one would overflow the
    /// budget, at which point the accumulator is flushed as a completed
    /// chunk. A sentence whose own token length exceeds the budget is dropped
    /// outright rather than truncated or emitted oversized.
    #[inline]
    pub fn create_chunks(&self, text: &str, max_tokens: usize) -> Vec<String> {
        let mut state = text
            .split(SENTENCE_DELIMITER)
            .filter(|sentence| !sentence.is_empty())
            .fold(ChunkState::default(), |mut state, sentence| {
                // Counted with the leading space the sentence will have once
                // joined mid-chunk; BPE boundaries differ without it.
                let token_length = self.tokenizer.count_tokens(&format!(" {sentence}"));

                if state.running_total + token_length > max_tokens {
                    state.flush();
                }

                if token_length > max_tokens {
                    debug!(
                        "Dropping sentence of {} tokens (budget {})",
                        token_length, max_tokens
                    );
                    return state;
                }

                state.accumulator.push(sentence.to_string());
                // +1 for the delimiter joining it to the next sentence.
                state.running_total += token_length + 1;
                state
            });

        if !state.accumulator.is_empty() {
            state.flush();
        }

        debug!(
            "Split {} bytes of text into {} chunk(s)",
            text.len(),
            state.chunks.len()
        );

        state.chunks
    }
}
