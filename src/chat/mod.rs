//! Assistant chat transcript.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::RemoteGenerationClient;
use crate::error::ChatError;

pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";
pub const EMPTY_REPLY: &str = "Sorry, I couldn't generate a response.";
pub const GREETING: &str = "Hi! I am your TubeMagic Assistant. Need help refining your script or strategy?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    /// The assistant
    Model,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// Append-only conversation with the assistant. Lives for one session.
pub struct ChatController {
    client: Arc<dyn RemoteGenerationClient>,
    transcript: Vec<ChatMessage>,
}

impl ChatController {
    pub fn new(client: Arc<dyn RemoteGenerationClient>) -> Self {
        Self {
            client,
            transcript: Vec::new(),
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Send one user turn and return the reply appended for it. Blank input
    /// is ignored. Failures append the apology entry; the returned error is
    /// informational and the conversation stays usable.
    pub async fn send(&mut self, message: &str) -> Result<Option<ChatMessage>, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Ok(None);
        }

        let prior = self.transcript.clone();
        self.transcript.push(ChatMessage::user(message));

        match self.client.chat(message, &prior).await {
            Ok(reply) => {
                let reply = if reply.trim().is_empty() {
                    ChatMessage::model(EMPTY_REPLY)
                } else {
                    ChatMessage::model(reply)
                };
                self.transcript.push(reply.clone());
                Ok(Some(reply))
            }
            Err(e) => {
                warn!("Chat request failed: {}", e);
                self.transcript.push(ChatMessage::model(APOLOGY));
                Err(ChatError::Remote(e))
            }
        }
    }
}
