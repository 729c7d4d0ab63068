//! Multi-turn chat history.
//!
//! A [`Conversation`] starts with one system message and grows by exactly
//! two entries (user, assistant) per successful turn. Each chat session owns
//! its own conversation; nothing here is shared between sessions.

use crate::error::AskError;
use crate::models::Message;
use crate::provider::{CompletionClient, CompletionRequest};

/// Ordered chat transcript for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Completed user/assistant exchanges.
    pub fn turns(&self) -> usize {
        (self.messages.len() - 1) / 2
    }
}

/// Run one chat turn over the whole history.
///
/// On success both the user message and the reply are appended. On failure
/// the history is left exactly as it was.
pub async fn chat_turn(
    completer: &dyn CompletionClient,
    conversation: &mut Conversation,
    model: &str,
    user_text: &str,
) -> Result<String, AskError> {
    conversation.messages.push(Message::user(user_text));

    let request = CompletionRequest::new(model, conversation.messages.clone());

    match completer.complete(&request).await {
        Ok(reply) => {
            conversation.messages.push(Message::assistant(reply.clone()));
            Ok(reply)
        }
        Err(e) => {
            conversation.messages.pop();
            Err(AskError::completion(e))
        }
    }
}
