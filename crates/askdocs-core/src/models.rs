//! Core data models used throughout askdocs.
//!
//! These types represent the documents, chunks, retrieval table, and chat
//! messages that flow through the indexing and question-answering pipeline.

use serde::{Deserialize, Serialize};

use crate::error::AskError;

/// A scraped page: a path-like identifier and its newline-flattened text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub text: String,
}

impl Document {
    /// Text that is counted, chunked, and embedded for this document.
    ///
    /// The identifier is prefixed so that the page path travels with the
    /// content into the retrieved context, where the model can cite it.
    pub fn indexed_text(&self) -> String {
        format!("{}. {}", self.id, self.text)
    }
}

/// A bounded span of document text with its token count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub token_count: usize,
}

/// A [`Chunk`] paired with its embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub text: String,
    pub token_count: usize,
    pub embedding: Vec<f32>,
}

impl EmbeddedChunk {
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            text: chunk.text,
            token_count: chunk.token_count,
            embedding,
        }
    }
}

/// The persisted collection searched by the retriever.
///
/// Row order carries no meaning beyond breaking distance ties. The table
/// records the embedding model and dimensionality it was built with so a
/// query-time model mismatch is caught before any distance is computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalTable {
    pub model: String,
    pub dims: usize,
    pub rows: Vec<EmbeddedChunk>,
}

impl RetrievalTable {
    pub fn new(model: impl Into<String>, dims: usize, rows: Vec<EmbeddedChunk>) -> Self {
        Self {
            model: model.into(),
            dims,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Check that this table can be queried with vectors from `model`/`dims`.
    pub fn validate_for(&self, model: &str, dims: usize) -> Result<(), AskError> {
        if self.model != model {
            return Err(AskError::Configuration(format!(
                "retrieval table was embedded with '{}' but the query model is '{}'",
                self.model, model
            )));
        }
        if self.dims != dims {
            return Err(AskError::Configuration(format!(
                "retrieval table has {} dimensions but the query model produces {}",
                self.dims, dims
            )));
        }
        if let Some((pos, row)) = self
            .rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.embedding.len() != dims)
        {
            return Err(AskError::Configuration(format!(
                "row {} has {} dimensions, expected {}",
                pos,
                row.embedding.len(),
                dims
            )));
        }
        Ok(())
    }
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of a chat transcript, in the completion API's wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
