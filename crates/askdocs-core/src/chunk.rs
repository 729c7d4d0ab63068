//! Token-budgeted recursive text chunker.
//!
//! Documents whose token count fits the budget are kept whole. Larger
//! documents are split by a [`RecursiveSplitter`] on progressively finer
//! boundaries until every piece fits a character ceiling derived from the
//! token budget.
//!
//! # Algorithm
//!
//! 1. Count tokens of the whole text. If `<= token_limit`, emit it unchanged.
//! 2. Otherwise set `max_chars = token_limit × chars_per_token`.
//! 3. Split on the coarsest separator (`"\n\n"`), keeping each separator
//!    attached to the piece before it.
//! 4. Greedily merge adjacent pieces into the longest span `<= max_chars`.
//! 5. A piece that alone exceeds `max_chars` is split again with the next
//!    separator (`". "`, then `" "`), and finally cut per character.
//! 6. Re-count tokens for every emitted chunk.
//!
//! Lengths are measured in characters, not bytes, and never re-measured in
//! tokens while splitting, so a chunk's token count is only approximately
//! bounded by the budget.
//!
//! Concatenating a split document's chunks reproduces it exactly, except
//! that spans consisting only of whitespace are dropped. Every other
//! character is kept, in order. Corpus text is whitespace-collapsed by the
//! loader, so such spans only arise from raw input.
//!
//! # Example
//!
//! ```rust
//! use askdocs_core::chunk::Chunker;
//! use askdocs_core::tokenizer::CharRatioCounter;
//!
//! let chunker = Chunker::new(1000, 1, CharRatioCounter::new(4));
//! let chunks = chunker.chunk("Hello world.\n\nSecond paragraph.");
//! assert_eq!(chunks.len(), 1);
//! ```

use crate::models::Chunk;
use crate::tokenizer::TokenCounter;

/// Boundary separators, coarsest first: paragraph, sentence, word.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", ". ", " "];

/// Splits text on a separator hierarchy into spans of at most `max_chars`.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    max_chars: usize,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    /// `max_chars` is clamped to at least 1.
    pub fn new(max_chars: usize, separators: &[&str]) -> Self {
        Self {
            max_chars: max_chars.max(1),
            separators: separators.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Splitter with [`DEFAULT_SEPARATORS`].
    pub fn prose(max_chars: usize) -> Self {
        Self::new(max_chars, DEFAULT_SEPARATORS)
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Split `text` into ordered, non-overlapping spans.
    ///
    /// Concatenating the result reproduces `text`, minus any whitespace-only
    /// spans, which are dropped.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, 0)
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect()
    }

    fn split_recursive(&self, text: &str, sep_index: usize) -> Vec<String> {
        if char_len(text) <= self.max_chars {
            return vec![text.to_string()];
        }
        let Some(sep) = self.separators.get(sep_index) else {
            return self.force_split(text);
        };

        let pieces: Vec<&str> = text.split_inclusive(sep.as_str()).collect();
        if pieces.len() <= 1 {
            return self.split_recursive(text, sep_index + 1);
        }

        let mut out = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;

        for piece in pieces {
            let piece_len = char_len(piece);

            if piece_len > self.max_chars {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                out.extend(self.split_recursive(piece, sep_index + 1));
                continue;
            }

            if current_len + piece_len > self.max_chars && !current.is_empty() {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push_str(piece);
            current_len += piece_len;
        }

        if !current.is_empty() {
            out.push(current);
        }
        out
    }

    /// Last resort: cut every `max_chars` characters.
    fn force_split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(self.max_chars)
            .map(|c| c.iter().collect())
            .collect()
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Turns document text into [`Chunk`]s under a token budget.
pub struct Chunker<C> {
    token_limit: usize,
    splitter: RecursiveSplitter,
    counter: C,
}

impl<C: TokenCounter> Chunker<C> {
    /// Build a chunker whose character ceiling is `token_limit × chars_per_token`.
    pub fn new(token_limit: usize, chars_per_token: usize, counter: C) -> Self {
        let max_chars = token_limit.saturating_mul(chars_per_token.max(1));
        Self {
            token_limit,
            splitter: RecursiveSplitter::prose(max_chars),
            counter,
        }
    }

    pub fn token_limit(&self) -> usize {
        self.token_limit
    }

    /// Character ceiling applied to split chunks.
    pub fn max_chars(&self) -> usize {
        self.splitter.max_chars()
    }

    pub fn counter(&self) -> &C {
        &self.counter
    }

    /// Chunk a single document's text.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let token_count = self.counter.count(text);
        if token_count <= self.token_limit {
            return vec![Chunk {
                text: text.to_string(),
                token_count,
            }];
        }

        self.splitter
            .split(text)
            .into_iter()
            .map(|piece| {
                let token_count = self.counter.count(&piece);
                Chunk {
                    text: piece,
                    token_count,
                }
            })
            .collect()
    }

    /// Chunk every document in order. Absent texts are skipped.
    pub fn chunk_corpus<'t, I>(&self, texts: I) -> Vec<Chunk>
    where
        I: IntoIterator<Item = Option<&'t str>>,
    {
        let mut out = Vec::new();
        for (idx, text) in texts.into_iter().enumerate() {
            let Some(text) = text else {
                tracing::debug!(row = idx, "skipping row with no text");
                continue;
            };
            let chunks = self.chunk(text);
            if chunks.len() > 1 {
                tracing::debug!(row = idx, chunks = chunks.len(), "split oversized document");
            }
            out.extend(chunks);
        }
        out
    }
}
