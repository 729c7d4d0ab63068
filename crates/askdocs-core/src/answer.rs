//! Question answering over a retrieval table.
//!
//! [`create_context`] embeds the question and packs the nearest chunks into
//! the context budget; [`answer_question`] wraps that context in the prompt
//! template and asks the completion service. Both return typed
//! [`AskError`]s instead of degrading to an empty string.

use crate::context::{self, ContextSelection};
use crate::distance::DistanceMetric;
use crate::error::AskError;
use crate::models::{Message, RetrievalTable};
use crate::prompt::build_prompt;
use crate::provider::{CompletionClient, CompletionRequest, Embedder};

/// Tuning for a single [`answer_question`] call.
#[derive(Debug, Clone)]
pub struct AskOptions {
    /// Completion model identifier.
    pub model: String,
    /// Context budget in tokens.
    pub max_len: usize,
    /// Maximum tokens in the generated answer.
    pub max_tokens: u32,
    pub stop_sequence: Option<String>,
    /// Log the assembled context and call parameters.
    pub debug: bool,
    pub metric: DistanceMetric,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_len: 1800,
            max_tokens: 150,
            stop_sequence: None,
            debug: false,
            metric: DistanceMetric::Cosine,
        }
    }
}

/// A generated answer and the context it was grounded on.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub context: ContextSelection,
}

/// Embed `question` and assemble the closest chunks under `max_len` tokens.
///
/// Fails with [`AskError::Configuration`] when the table was built with a
/// different model or dimensionality than `embedder`, and with
/// [`AskError::Retrieval`] when the question cannot be embedded.
pub async fn create_context(
    embedder: &dyn Embedder,
    table: &RetrievalTable,
    question: &str,
    max_len: usize,
    metric: DistanceMetric,
) -> Result<ContextSelection, AskError> {
    table.validate_for(embedder.model_name(), embedder.dims())?;

    let query = embedder
        .embed_one(question)
        .await
        .map_err(AskError::retrieval)?;
    if query.len() != table.dims {
        return Err(AskError::Configuration(format!(
            "question embedding has {} dimensions, table has {}",
            query.len(),
            table.dims
        )));
    }

    Ok(context::select(&query, table, metric, max_len))
}

/// Answer `question` from the context found in `table`.
pub async fn answer_question(
    embedder: &dyn Embedder,
    completer: &dyn CompletionClient,
    table: &RetrievalTable,
    question: &str,
    opts: &AskOptions,
) -> Result<Answer, AskError> {
    let context = create_context(embedder, table, question, opts.max_len, opts.metric).await?;

    if context.is_empty() {
        tracing::warn!(max_len = opts.max_len, "no chunk fits the context budget");
    }

    if opts.debug {
        tracing::info!("Context:\n{}\n", context.text);
        tracing::info!(
            model = %opts.model,
            question = %question,
            max_tokens = opts.max_tokens,
            stop_sequence = ?opts.stop_sequence,
            chunks = context.indices.len(),
            context_tokens = context.tokens,
            "answer request"
        );
    }

    let prompt = build_prompt(&context.text, question);
    let request = CompletionRequest::deterministic(&opts.model, vec![Message::user(prompt)])
        .with_max_tokens(opts.max_tokens)
        .with_stop(opts.stop_sequence.clone());

    let text = completer
        .complete(&request)
        .await
        .map_err(AskError::completion)?;

    Ok(Answer { text, context })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmbeddedChunk;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns the same vector for every input.
    struct FixedEmbedder {
        model: String,
        vector: Vec<f32>,
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        fn model_name(&self) -> &str {
            &self.model
        }
        fn dims(&self) -> usize {
            self.vector.len()
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| self.vector.clone()).collect())
        }
    }

    struct DownEmbedder;

    #[async_trait]
    impl Embedder for DownEmbedder {
        fn model_name(&self) -> &str {
            "m"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            anyhow::bail!("connection refused")
        }
    }

    /// Records the last request and replies with a canned answer or error.
    struct ScriptedCompleter {
        reply: Option<String>,
        seen: Mutex<Option<CompletionRequest>>,
    }

    #[async_trait]
    impl CompletionClient for ScriptedCompleter {
        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            *self.seen.lock().unwrap() = Some(request.clone());
            match &self.reply {
                Some(r) => Ok(r.clone()),
                None => anyhow::bail!("HTTP 503"),
            }
        }
    }

    fn table() -> RetrievalTable {
        let rows = vec![
            EmbeddedChunk {
                text: "far".to_string(),
                token_count: 10,
                embedding: vec![0.0, 1.0],
            },
            EmbeddedChunk {
                text: "near".to_string(),
                token_count: 10,
                embedding: vec![1.0, 0.1],
            },
        ];
        RetrievalTable::new("m", 2, rows)
    }

    fn embedder() -> FixedEmbedder {
        FixedEmbedder {
            model: "m".to_string(),
            vector: vec![1.0, 0.0],
        }
    }

    #[tokio::test]
    async fn test_context_orders_by_distance() {
        let sel = create_context(&embedder(), &table(), "q", 1000, DistanceMetric::Cosine)
            .await
            .unwrap();
        assert_eq!(sel.text, "near\n\n###\n\nfar");
    }

    #[tokio::test]
    async fn test_model_mismatch_is_configuration_error() {
        let other = FixedEmbedder {
            model: "other".to_string(),
            vector: vec![1.0, 0.0],
        };
        let err = create_context(&other, &table(), "q", 1000, DistanceMetric::Cosine)
            .await
            .unwrap_err();
        assert!(matches!(err, AskError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_embedding_failure_is_retrieval_error() {
        let err = create_context(&DownEmbedder, &table(), "q", 1000, DistanceMetric::Cosine)
            .await
            .unwrap_err();
        assert!(matches!(err, AskError::Retrieval(ref m) if m.contains("connection refused")));
    }

    #[tokio::test]
    async fn test_answer_sends_grounded_prompt() {
        let completer = ScriptedCompleter {
            reply: Some("HTML is a markup language.".to_string()),
            seen: Mutex::new(None),
        };
        let opts = AskOptions {
            max_len: 14,
            stop_sequence: Some("\n".to_string()),
            ..AskOptions::default()
        };
        let answer = answer_question(&embedder(), &completer, &table(), "What?", &opts)
            .await
            .unwrap();

        assert_eq!(answer.text, "HTML is a markup language.");
        assert_eq!(answer.context.text, "near");

        let req = completer.seen.lock().unwrap().clone().unwrap();
        assert_eq!(req.model, "gpt-4o");
        assert_eq!(req.temperature, 0.0);
        assert_eq!(req.max_tokens, Some(150));
        assert_eq!(req.stop.as_deref(), Some("\n"));
        assert_eq!(req.messages.len(), 1);
        assert!(req.messages[0].content.contains("Context: near\n\n---"));
        assert!(req.messages[0].content.contains("Question: What?\nAnswer:"));
    }

    #[tokio::test]
    async fn test_completion_failure_is_typed() {
        let completer = ScriptedCompleter {
            reply: None,
            seen: Mutex::new(None),
        };
        let err = answer_question(&embedder(), &completer, &table(), "q", &AskOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AskError::Completion(ref m) if m.contains("503")));
    }

    #[tokio::test]
    async fn test_empty_context_still_asks() {
        let completer = ScriptedCompleter {
            reply: Some("I don't know.".to_string()),
            seen: Mutex::new(None),
        };
        let opts = AskOptions {
            max_len: 5,
            ..AskOptions::default()
        };
        let answer = answer_question(&embedder(), &completer, &table(), "q", &opts)
            .await
            .unwrap();
        assert!(answer.context.is_empty());
        assert_eq!(answer.text, "I don't know.");
    }
}
