//! Wire types for the chat-completion relay.

use serde::{Deserialize, Serialize};

/// Completion token budget used when the caller does not set one.
const DEFAULT_MAX_TOKENS: u32 = 500;

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Incoming chat-completion request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub stream: bool,
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

impl ChatRequest {
    /// Resolve the target deployment: the request's model first, the
    /// configured default second.
    pub fn resolve_model<'a>(&'a self, default_deployment: Option<&'a str>) -> Option<&'a str> {
        self.model.as_deref().or(default_deployment)
    }
}

/// JSON body sent to the upstream endpoint.
#[derive(Debug, Serialize)]
pub struct UpstreamPayload<'a> {
    pub messages: &'a [ChatMessage],
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}
