//! Common types for LLM interactions

use crate::runtime::{Speaker, Turn};

/// LLM request
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Persona instruction sent ahead of the conversation
    pub system: Option<String>,
    pub messages: Vec<LlmMessage>,
    pub max_tokens: Option<u32>,
}

impl LlmRequest {
    /// Build a request carrying the whole transcript, oldest turn first
    pub fn from_transcript(system: Option<&str>, turns: &[Turn]) -> Self {
        Self {
            system: system.map(str::to_string),
            messages: turns.iter().map(LlmMessage::from).collect(),
            max_tokens: None,
        }
    }
}

/// Message in conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub text: String,
}

impl LlmMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            text: text.into(),
        }
    }
}

impl From<&Turn> for LlmMessage {
    fn from(turn: &Turn) -> Self {
        match turn.speaker {
            Speaker::User => Self::user(&turn.text),
            Speaker::Assistant => Self::assistant(&turn.text),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

/// LLM response
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub text: String,
    pub end_turn: bool,
    pub usage: Usage,
}

impl LlmResponse {
    /// Plain text reply, as a mock or test fixture would produce it
    #[cfg(test)]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            end_turn: true,
            usage: Usage::default(),
        }
    }
}

/// Usage statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_transcript_keeps_order_and_roles() {
        let turns = vec![
            Turn::user("hola"),
            Turn::assistant("¿cómo estás?"),
            Turn::user("cansado"),
        ];
        let request = LlmRequest::from_transcript(Some("persona"), &turns);

        assert_eq!(request.system.as_deref(), Some("persona"));
        assert_eq!(
            request.messages,
            vec![
                LlmMessage::user("hola"),
                LlmMessage::assistant("¿cómo estás?"),
                LlmMessage::user("cansado"),
            ]
        );
    }
}
