//! Wire types for the chat completion API.

use serde::{Deserialize, Serialize};

/// One message in the outgoing conversation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role ("user" or "assistant")
    pub role: String,

    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Build a message.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Request body for the chat completion endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,

    /// Conversation window, oldest first
    pub messages: Vec<ChatMessage>,
}

/// Success response body from the chat completion endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Model name echoed by the provider
    pub model: String,

    /// Token accounting for the call
    pub usage: ApiUsage,

    /// Completion choices; the first one carries the reply
    pub choices: Vec<Choice>,
}

/// Token usage reported by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiUsage {
    /// Total tokens consumed (prompt + completion)
    pub total_tokens: i64,
}

/// One completion choice.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    /// The assistant message for this choice
    pub message: ResponseMessage,
}

/// Assistant message inside a completion choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    /// Reply text
    pub content: String,
}
