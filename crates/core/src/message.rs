//! Chat message and request value objects.
//!
//! These flow through the entire system: the caller posts a `ChatRequest`,
//! mutators rewrite it, the provider answers with an assistant `Message`.
//! The wire shape matches the OpenAI chat-completions format so the gateway
//! can forward bodies without translation.

use serde::{Deserialize, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (identity, rules, injected context)
    System,
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// Tool execution result
    Tool,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,
}

impl Message {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// The mutable chat request being built for one gateway call.
///
/// Owned exclusively by the pipeline for the duration of the request;
/// never shared across requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The target model identifier (e.g., "gpt-4o")
    pub model: String,

    /// Ordered conversation messages
    pub messages: Vec<Message>,

    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Whether the caller wants a streamed response
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    /// The content of the most recent user-role message, if any.
    pub fn last_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// Append `block` to the first system message, or insert a new system
    /// message before the first user message if the conversation has none.
    pub fn inject_into_system(&mut self, block: &str) {
        if let Some(system) = self.messages.iter_mut().find(|m| m.role == Role::System) {
            if system.content.is_empty() {
                system.content = block.to_string();
            } else {
                system.content.push_str("\n\n");
                system.content.push_str(block);
            }
            return;
        }

        let at = self
            .messages
            .iter()
            .position(|m| m.role == Role::User)
            .unwrap_or(0);
        self.messages.insert(at, Message::system(block));
    }
}
