//! Error taxonomy for query-time operations.
//!
//! Indexing failures are fatal and travel as plain [`anyhow::Error`]s up to
//! the CLI. Query-time failures are typed so callers can tell "the model had
//! nothing to say" apart from "the service is unavailable".

/// Errors surfaced by context assembly, answering, and chat turns.
#[derive(Debug, thiserror::Error)]
pub enum AskError {
    /// The retrieval table and the configured query model disagree.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Embedding the question failed.
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    /// The completion endpoint failed or returned nothing usable.
    #[error("completion failed: {0}")]
    Completion(String),
}

impl AskError {
    /// Wrap an embedding failure, keeping the full cause chain.
    pub fn retrieval(err: anyhow::Error) -> Self {
        Self::Retrieval(format!("{:#}", err))
    }

    /// Wrap a completion failure, keeping the full cause chain.
    pub fn completion(err: anyhow::Error) -> Self {
        Self::Completion(format!("{:#}", err))
    }
}
