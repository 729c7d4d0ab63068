//! Client traits for the external embedding and completion services.
//!
//! Implementations are constructed by the application and passed into the
//! answerer and chat functions, so tests can substitute deterministic
//! doubles for the network-backed clients.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::Message;

/// Maps text to fixed-length vectors with a single, fixed model.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;

    /// Embed a batch of texts, returning one vector per input in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
    }
}

/// Parameters of one chat completion call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<String>,
}

impl CompletionRequest {
    /// Request with the service's default sampling (temperature 1, top-p 1).
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: 1.0,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            max_tokens: None,
            stop: None,
        }
    }

    /// Deterministic-leaning sampling: temperature 0, top-p 1, no penalties.
    pub fn deterministic(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            temperature: 0.0,
            ..Self::new(model, messages)
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_stop(mut self, stop: Option<String>) -> Self {
        self.stop = stop;
        self
    }
}

/// Generates text from an ordered message list.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}
