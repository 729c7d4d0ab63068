use anyhow::{Context, Result};
use askdocs_core::distance::DistanceMetric;
use askdocs_core::prompt::DEFAULT_SYSTEM_PROMPT;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable holding the OpenAI API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable holding the Telegram bot token.
pub const TG_BOT_TOKEN_ENV: &str = "TG_BOT_TOKEN";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub bot: BotConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub root: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_skip_patterns")]
    pub skip_patterns: Vec<String>,
}

fn default_extension() -> String {
    "txt".to_string()
}
fn default_skip_patterns() -> Vec<String> {
    vec![
        "*user/fxa/login*".to_string(),
        "*contributors.txt".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_token_limit")]
    pub chunk_token_limit: usize,
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_token_limit: default_chunk_token_limit(),
            chars_per_token: default_chars_per_token(),
        }
    }
}

fn default_chunk_token_limit() -> usize {
    1000
}
fn default_chars_per_token() -> usize {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_context_token_limit")]
    pub context_token_limit: usize,
    #[serde(default)]
    pub distance_metric: DistanceMetric,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            context_token_limit: default_context_token_limit(),
            distance_metric: DistanceMetric::Cosine,
        }
    }
}

fn default_context_token_limit() -> usize {
    1800
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dims: default_dims(),
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            base_url: default_base_url(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_batch_size() -> usize {
    64
}
fn default_concurrency() -> usize {
    4
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    /// Model used for context-grounded answers.
    #[serde(default = "default_answer_model")]
    pub model: String,
    /// Model used by the chat front end.
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub stop_sequence: Option<String>,
    #[serde(default = "default_completion_retries")]
    pub max_retries: u32,
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: default_answer_model(),
            chat_model: default_chat_model(),
            max_tokens: default_max_tokens(),
            stop_sequence: None,
            max_retries: default_completion_retries(),
            timeout_secs: default_completion_timeout_secs(),
            base_url: default_base_url(),
        }
    }
}

fn default_answer_model() -> String {
    "gpt-4o".to_string()
}
fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_max_tokens() -> u32 {
    150
}
fn default_completion_retries() -> u32 {
    2
}
fn default_completion_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_greeting")]
    pub greeting: String,
    #[serde(default = "default_unavailable_message")]
    pub unavailable_message: String,
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    /// Drop a session's history after this many idle seconds. Unset keeps
    /// sessions for the life of the process.
    #[serde(default)]
    pub session_ttl_secs: Option<u64>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            greeting: default_greeting(),
            unavailable_message: default_unavailable_message(),
            poll_timeout_secs: default_poll_timeout_secs(),
            session_ttl_secs: None,
        }
    }
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}
fn default_greeting() -> String {
    "I'm a bot, please talk to me!".to_string()
}
fn default_unavailable_message() -> String {
    "Sorry, I can't reach the language model right now. Please try again in a moment."
        .to_string()
}
fn default_poll_timeout_secs() -> u64 {
    30
}

/// Read an API credential from the environment.
pub fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => anyhow::bail!("{} environment variable not set", name),
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate corpus
    if config.corpus.extension.trim().is_empty() {
        anyhow::bail!("corpus.extension must not be empty");
    }

    // Validate chunking
    if config.chunking.chunk_token_limit == 0 {
        anyhow::bail!("chunking.chunk_token_limit must be > 0");
    }
    if config.chunking.chars_per_token == 0 {
        anyhow::bail!("chunking.chars_per_token must be > 0");
    }

    // Validate retrieval
    if config.retrieval.context_token_limit == 0 {
        anyhow::bail!("retrieval.context_token_limit must be > 0");
    }

    // Validate embedding
    if config.embedding.model.trim().is_empty() {
        anyhow::bail!("embedding.model must not be empty");
    }
    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }
    if config.embedding.concurrency == 0 {
        anyhow::bail!("embedding.concurrency must be >= 1");
    }

    // Validate completion
    if config.completion.model.trim().is_empty() || config.completion.chat_model.trim().is_empty()
    {
        anyhow::bail!("completion.model and completion.chat_model must not be empty");
    }
    if config.completion.max_tokens == 0 {
        anyhow::bail!("completion.max_tokens must be > 0");
    }

    Ok(())
}
