//! API request and response types

use crate::runtime::{Speaker, Turn, ENGINE_FALLBACK_MESSAGE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// One line of the transcript as the widget renders it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    /// Display-only entry standing in for a failed engine reply
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

impl TranscriptEntry {
    pub fn fallback() -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: ENGINE_FALLBACK_MESSAGE.to_string(),
            error: true,
        }
    }
}

impl From<&Turn> for TranscriptEntry {
    fn from(turn: &Turn) -> Self {
        Self {
            speaker: turn.speaker,
            text: turn.text.clone(),
            error: false,
        }
    }
}

pub fn visible_transcript(turns: &[Turn]) -> Vec<TranscriptEntry> {
    turns.iter().map(TranscriptEntry::from).collect()
}

/// Response with a session and its transcript
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub transcript: Vec<TranscriptEntry>,
}

/// Response for chat action
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub transcript: Vec<TranscriptEntry>,
    /// Apology shown when the engine could not answer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for the health probe
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: usize,
    pub alerts_sent: u64,
    pub alerts_failed: u64,
    pub classifier_failures: u64,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
