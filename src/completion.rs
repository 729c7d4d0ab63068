//! OpenAI chat completion client.

use anyhow::Result;
use askdocs_core::provider::{CompletionClient, CompletionRequest};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::{require_env, CompletionConfig, OPENAI_API_KEY_ENV};
use crate::embedding::post_json_with_retry;

/// Chat client for `POST {base_url}/chat/completions`.
pub struct OpenAIChat {
    client: reqwest::Client,
    api_key: String,
    url: String,
    max_retries: u32,
}

impl OpenAIChat {
    /// # Errors
    ///
    /// Returns an error if `OPENAI_API_KEY` is not set.
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let api_key = require_env(OPENAI_API_KEY_ENV)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            url: format!(
                "{}/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAIChat {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = serde_json::to_value(request)?;
        let json = post_json_with_retry(
            &self.client,
            &self.url,
            &self.api_key,
            &body,
            self.max_retries,
        )
        .await?;
        parse_chat_response(&json)
    }
}

/// Pull `choices[0].message.content`, trimmed.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    let content = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message"))?;

    Ok(content.trim().to_string())
}
