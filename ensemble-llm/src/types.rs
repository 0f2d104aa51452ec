//! Core types for LLM requests and responses.

use serde::{Deserialize, Serialize};

/// Who said a transcript line, in chat-completion terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The character being prompted.
    Assistant,
    /// The conversation partner.
    User,
}

impl Role {
    /// Wire name for chat APIs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assistant => "assistant",
            Self::User => "user",
        }
    }
}

/// One role-tagged transcript line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Speaker role from the prompted character's perspective.
    pub role: Role,
    /// Line content.
    pub content: String,
}

impl ChatMessage {
    /// A line spoken by the prompted character.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// A line spoken by the conversation partner.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A request to the LLM.
#[derive(Debug, Clone, Serialize)]
pub struct LlmRequest {
    /// System prompt (persona, situation, output format rules).
    pub system: String,
    /// Role-tagged conversation so far, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl LlmRequest {
    /// Create a request with the default generation settings.
    #[must_use]
    pub fn new(system: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            system: system.into(),
            messages,
            max_tokens: 200,
            temperature: 0.8,
            timeout_ms: 8000,
        }
    }

    /// Set the token cap.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// A response from the LLM.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmResponse {
    /// The generated text.
    pub text: String,
    /// Tokens consumed by the prompt, when the backend reports it.
    pub prompt_tokens: u32,
    /// Tokens generated.
    pub completion_tokens: u32,
    /// Latency in milliseconds.
    pub latency_ms: u64,
    /// Which model was used.
    pub model: String,
}

/// Structured conversational reply from a character agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReply {
    /// The spoken line.
    pub text: String,
    /// How the speaker felt about the exchange (-1.0 to 1.0).
    pub sentiment: f32,
}

impl AgentReply {
    /// Build a reply with the sentiment clamped into range.
    #[must_use]
    pub fn new(text: impl Into<String>, sentiment: f32) -> Self {
        Self {
            text: text.into(),
            sentiment: sentiment.clamp(-1.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_clamps_sentiment() {
        assert!((AgentReply::new("hi", 3.0).sentiment - 1.0).abs() < f32::EPSILON);
        assert!((AgentReply::new("hi", -3.0).sentiment + 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn request_builders_apply() {
        let request = LlmRequest::new("sys", vec![ChatMessage::user("hello")])
            .with_max_tokens(64)
            .with_temperature(0.2)
            .with_timeout(1500);

        assert_eq!(request.max_tokens, 64);
        assert!((request.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(request.timeout_ms, 1500);
        assert_eq!(request.messages.len(), 1);
    }
}
