//! `ask` and `context` commands.
//!
//! Both load the retrieval table from SQLite, build the OpenAI clients from
//! configuration, and call into `askdocs_core::answer`. Failures are
//! reported as [`AskError`]s so the CLI can tell configuration problems
//! apart from service outages.

use askdocs_core::answer::{answer_question, create_context, AskOptions};
use askdocs_core::error::AskError;
use askdocs_core::models::RetrievalTable;

use crate::completion::OpenAIChat;
use crate::config::Config;
use crate::db;
use crate::embedding::OpenAIEmbedder;
use crate::table;

/// Per-call overrides from the command line. `None` falls back to config.
#[derive(Debug, Clone, Default)]
pub struct AskArgs {
    pub model: Option<String>,
    pub max_len: Option<usize>,
    pub max_tokens: Option<u32>,
    pub stop: Option<String>,
    pub debug: bool,
}

/// Merge command-line overrides over the configured defaults.
pub fn ask_options(config: &Config, args: &AskArgs) -> AskOptions {
    AskOptions {
        model: args
            .model
            .clone()
            .unwrap_or_else(|| config.completion.model.clone()),
        max_len: args
            .max_len
            .unwrap_or(config.retrieval.context_token_limit),
        max_tokens: args.max_tokens.unwrap_or(config.completion.max_tokens),
        stop_sequence: args
            .stop
            .clone()
            .or_else(|| config.completion.stop_sequence.clone()),
        debug: args.debug,
        metric: config.retrieval.distance_metric,
    }
}

/// Answer `question` and print the answer on stdout.
pub async fn run_ask(config: &Config, question: &str, args: &AskArgs) -> Result<(), AskError> {
    let table = load_retrieval_table(config).await?;
    let embedder = OpenAIEmbedder::new(&config.embedding).map_err(configuration)?;
    let completer = OpenAIChat::new(&config.completion).map_err(configuration)?;
    let opts = ask_options(config, args);

    let answer = answer_question(&embedder, &completer, &table, question, &opts).await?;

    tracing::debug!(
        chunks = answer.context.indices.len(),
        context_tokens = answer.context.tokens,
        "answered"
    );
    println!("{}", answer.text);
    Ok(())
}

/// Print the context that would be sent for `question`, without answering.
pub async fn run_context(
    config: &Config,
    question: &str,
    max_len: Option<usize>,
) -> Result<(), AskError> {
    let table = load_retrieval_table(config).await?;
    let embedder = OpenAIEmbedder::new(&config.embedding).map_err(configuration)?;
    let max_len = max_len.unwrap_or(config.retrieval.context_token_limit);

    let context = create_context(
        &embedder,
        &table,
        question,
        max_len,
        config.retrieval.distance_metric,
    )
    .await?;

    if context.is_empty() {
        eprintln!("No chunk fits within {} tokens.", max_len);
    } else {
        println!("{}", context.text);
        eprintln!(
            "{} chunks, {} tokens (budget {})",
            context.indices.len(),
            context.tokens,
            max_len
        );
    }
    Ok(())
}

async fn load_retrieval_table(config: &Config) -> Result<RetrievalTable, AskError> {
    let pool = db::connect(config).await.map_err(configuration)?;
    let table = table::load_table(&pool).await.map_err(configuration);
    pool.close().await;
    table
}

fn configuration(err: anyhow::Error) -> AskError {
    AskError::Configuration(format!("{:#}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        toml::from_str(
            r#"
[db]
path = "./data/askdocs.sqlite"

[corpus]
root = "./text"

[completion]
stop_sequence = "\n\n"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_options_default_to_config() {
        let opts = ask_options(&config(), &AskArgs::default());
        assert_eq!(opts.model, "gpt-4o");
        assert_eq!(opts.max_len, 1800);
        assert_eq!(opts.max_tokens, 150);
        assert_eq!(opts.stop_sequence.as_deref(), Some("\n\n"));
        assert!(!opts.debug);
    }

    #[test]
    fn test_overrides_win() {
        let args = AskArgs {
            model: Some("gpt-4o-mini".to_string()),
            max_len: Some(500),
            max_tokens: Some(64),
            stop: Some("END".to_string()),
            debug: true,
        };
        let opts = ask_options(&config(), &args);
        assert_eq!(opts.model, "gpt-4o-mini");
        assert_eq!(opts.max_len, 500);
        assert_eq!(opts.max_tokens, 64);
        assert_eq!(opts.stop_sequence.as_deref(), Some("END"));
        assert!(opts.debug);
    }
}
