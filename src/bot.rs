//! Chat command handling with per-session history.
//!
//! [`ChatBot`] is transport-independent: it maps an incoming text for a
//! session to an optional reply. The Telegram transport in
//! [`crate::telegram`] feeds it updates; tests drive it directly.
//!
//! Every session (a Telegram chat) has its own [`Conversation`]. Turns in
//! one session run one at a time behind that session's lock; sessions never
//! see each other's messages.

use askdocs_core::conversation::{chat_turn, Conversation};
use askdocs_core::provider::CompletionClient;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::BotConfig;

/// Chat identifier as assigned by the transport.
pub type SessionId = i64;

const USAGE_HINT: &str = "Usage: /chat <your message>";

/// A recognized bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    /// `/chat` with the (trimmed, possibly empty) message after it.
    Chat(String),
}

impl Command {
    /// Parse a message. Returns `None` for anything that is not a command
    /// this bot handles. Accepts the `/cmd@botname` form used in groups;
    /// when `bot_username` is known, commands addressed to another bot are
    /// ignored.
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let text = text.trim_start();
        let (head, rest) = match text.find(char::is_whitespace) {
            Some(i) => (&text[..i], &text[i..]),
            None => (text, ""),
        };
        let name = match head.split_once('@') {
            Some((name, target)) => {
                if let Some(me) = bot_username {
                    if !target.eq_ignore_ascii_case(me.trim_start_matches('@')) {
                        return None;
                    }
                }
                name
            }
            None => head,
        };

        match name {
            "/start" => Some(Command::Start),
            "/chat" => Some(Command::Chat(rest.trim().to_string())),
            _ => None,
        }
    }
}

struct Session {
    conversation: Arc<tokio::sync::Mutex<Conversation>>,
    last_seen: Instant,
}

/// Conversations keyed by session, created on first use.
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
    system_prompt: String,
    ttl: Option<Duration>,
}

impl SessionStore {
    pub fn new(system_prompt: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            system_prompt: system_prompt.into(),
            ttl,
        }
    }

    /// The conversation for `id`, starting a fresh one if needed.
    pub fn get_or_create(&self, id: SessionId) -> Arc<tokio::sync::Mutex<Conversation>> {
        let now = Instant::now();
        self.evict_idle(now);

        let mut sessions = self.lock();
        let session = sessions.entry(id).or_insert_with(|| {
            tracing::debug!(session = id, "new session");
            Session {
                conversation: Arc::new(tokio::sync::Mutex::new(Conversation::new(
                    self.system_prompt.clone(),
                ))),
                last_seen: now,
            }
        });
        session.last_seen = now;
        Arc::clone(&session.conversation)
    }

    /// Drop sessions idle for longer than the TTL as of `now`.
    /// Returns how many were removed.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, s| now.saturating_duration_since(s.last_seen) <= ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, "evicted idle sessions");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Transport-independent chat handler.
pub struct ChatBot<C> {
    completer: C,
    sessions: SessionStore,
    model: String,
    greeting: String,
    unavailable_message: String,
    username: Option<String>,
}

impl<C: CompletionClient> ChatBot<C> {
    pub fn new(completer: C, model: impl Into<String>, config: &BotConfig) -> Self {
        Self {
            completer,
            sessions: SessionStore::new(
                config.system_prompt.clone(),
                config.session_ttl_secs.map(Duration::from_secs),
            ),
            model: model.into(),
            greeting: config.greeting.clone(),
            unavailable_message: config.unavailable_message.clone(),
            username: None,
        }
    }

    /// Only answer `/cmd@name` when `name` is this bot.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Reply to `text` from `session`, or `None` if it is not a command.
    pub async fn handle(&self, session: SessionId, text: &str) -> Option<String> {
        match Command::parse(text, self.username.as_deref())? {
            Command::Start => Some(self.greeting.clone()),
            Command::Chat(message) if message.is_empty() => Some(USAGE_HINT.to_string()),
            Command::Chat(message) => Some(self.chat(session, &message).await),
        }
    }

    async fn chat(&self, session: SessionId, message: &str) -> String {
        let conversation = self.sessions.get_or_create(session);
        let mut conversation = conversation.lock().await;

        match chat_turn(&self.completer, &mut conversation, &self.model, message).await {
            Ok(reply) if reply.trim().is_empty() => {
                tracing::warn!(session, "empty completion");
                self.unavailable_message.clone()
            }
            Ok(reply) => {
                tracing::debug!(session, turns = conversation.turns(), "chat turn");
                reply
            }
            Err(e) => {
                tracing::warn!(session, error = %e, "chat turn failed");
                self.unavailable_message.clone()
            }
        }
    }
}
