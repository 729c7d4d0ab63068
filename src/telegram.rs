//! Telegram Bot API transport: long polling and message sending.
//!
//! The poll loop tracks the update offset, hands each update to its own
//! tokio task, and keeps going after transient errors.

use anyhow::{bail, Context, Result};
use askdocs_core::provider::CompletionClient;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::bot::ChatBot;
use crate::completion::OpenAIChat;
use crate::config::{require_env, Config, TG_BOT_TOKEN_ENV};

const API_BASE: &str = "https://api.telegram.org";
const RETRY_DELAY: Duration = Duration::from_secs(5);
/// sendMessage rejects longer texts.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Minimal Bot API client.
#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    token: String,
    poll_timeout_secs: u64,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>, poll_timeout_secs: u64) -> Result<Self> {
        // The HTTP timeout has to outlast the long poll.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 10))
            .build()?;
        Ok(Self {
            client,
            token: token.into(),
            poll_timeout_secs,
        })
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.token, method)
    }

    /// Long-poll for updates with `update_id >= offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<TelegramUpdate>> {
        let response = self
            .client
            .get(self.api_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", self.poll_timeout_secs.to_string()),
                ("allowed_updates", "[\"message\"]".to_string()),
            ])
            .send()
            .await
            .context("Telegram getUpdates failed")?;

        let body: TelegramApiResponse<Vec<TelegramUpdate>> = response
            .json()
            .await
            .context("Invalid Telegram response")?;
        body.into_result()
    }

    /// Send a plain-text message.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .context("sendMessage failed")?;

        let result: TelegramApiResponse<serde_json::Value> = response
            .json()
            .await
            .context("Invalid sendMessage response")?;
        result.into_result().map(|_| ())
    }

    pub async fn get_me(&self) -> Result<TelegramUser> {
        let response = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .context("getMe failed")?;
        let body: TelegramApiResponse<TelegramUser> = response
            .json()
            .await
            .context("Invalid getMe response")?;
        body.into_result()
    }
}

/// Run the bot until the process is stopped.
pub async fn run_bot(config: &Config) -> Result<()> {
    let token = require_env(TG_BOT_TOKEN_ENV)?;
    let completer = OpenAIChat::new(&config.completion)?;
    let telegram = TelegramClient::new(token, config.bot.poll_timeout_secs)?;

    let me = telegram.get_me().await?;
    let mut bot = ChatBot::new(completer, config.completion.chat_model.clone(), &config.bot);
    if let Some(username) = &me.username {
        bot = bot.with_username(username.clone());
    }
    let bot = Arc::new(bot);
    tracing::info!(
        username = me.username.as_deref().unwrap_or("unknown"),
        name = %me.first_name,
        model = %config.completion.chat_model,
        "Telegram bot started"
    );

    poll_loop(telegram, bot).await
}

async fn poll_loop<C>(telegram: TelegramClient, bot: Arc<ChatBot<C>>) -> Result<()>
where
    C: CompletionClient + 'static,
{
    let mut offset = 0i64;

    loop {
        let updates = match telegram.get_updates(offset).await {
            Ok(updates) => updates,
            Err(e) => {
                tracing::error!(error = %format!("{:#}", e), "Telegram polling error");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            let Some((chat_id, text)) = update.chat_text() else {
                continue;
            };

            let bot = Arc::clone(&bot);
            let telegram = telegram.clone();
            tokio::spawn(async move {
                let Some(reply) = bot.handle(chat_id, &text).await else {
                    return;
                };
                for piece in split_message(&reply, MAX_MESSAGE_CHARS) {
                    if let Err(e) = telegram.send_message(chat_id, &piece).await {
                        tracing::warn!(chat_id, error = %format!("{:#}", e), "reply not delivered");
                        return;
                    }
                }
            });
        }
    }
}

/// Split `text` into pieces of at most `limit` characters, preferring to
/// break after a newline.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut pieces = Vec::new();
    let mut rest = text;

    while rest.chars().count() > limit {
        let hard = rest
            .char_indices()
            .nth(limit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let cut = match rest[..hard].rfind('\n') {
            Some(i) if i > 0 => i + 1,
            _ => hard,
        };
        pieces.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }
    if !rest.is_empty() {
        pieces.push(rest.to_string());
    }
    pieces
}

// --- Telegram API Types ---

#[derive(Debug, Deserialize)]
pub struct TelegramApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

impl<T> TelegramApiResponse<T> {
    fn into_result(self) -> Result<T> {
        if !self.ok {
            bail!(
                "Telegram API error: {}",
                self.description.unwrap_or_default()
            );
        }
        self.result
            .ok_or_else(|| anyhow::anyhow!("Telegram API returned no result"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
}

impl TelegramUpdate {
    /// Chat id and text of a human-sent text message.
    pub fn chat_text(&self) -> Option<(i64, String)> {
        let msg = self.message.as_ref()?;
        let text = msg.text.as_ref()?;
        if msg.from.as_ref().is_some_and(|u| u.is_bot) {
            return None;
        }
        Some((msg.chat.id, text.clone()))
    }
}
