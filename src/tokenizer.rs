//! Exact token counting with the `cl100k_base` encoding.

use anyhow::Result;
use askdocs_core::tokenizer::TokenCounter;
use tiktoken_rs::CoreBPE;

/// Counts tokens the way the OpenAI embedding and chat models do.
pub struct Cl100kCounter {
    bpe: CoreBPE,
}

impl Cl100kCounter {
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()?;
        Ok(Self { bpe })
    }
}

impl TokenCounter for Cl100kCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}
