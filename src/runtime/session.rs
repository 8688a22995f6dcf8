//! Per-session conversation state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex as StdMutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

/// One utterance in a transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }
}

/// Append-only, chronologically ordered history of one conversation.
/// Appended turns are only ever handed out by shared reference.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }
}

/// A conversation session. The transcript lock is held for a whole turn,
/// so a session has at most one turn in flight. Readers go through a
/// published copy and never wait on that lock.
#[derive(Debug)]
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    last_active: StdMutex<Instant>,
    transcript: Mutex<Transcript>,
    published: RwLock<Vec<Turn>>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            last_active: StdMutex::new(Instant::now()),
            transcript: Mutex::new(Transcript::default()),
            published: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Mark the session as used now
    pub fn touch(&self) {
        *self.last_active.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }

    /// True while a turn holds the transcript
    pub fn is_busy(&self) -> bool {
        self.transcript.try_lock().is_err()
    }

    /// Wait for exclusive access to the transcript
    pub async fn lock(&self) -> TranscriptGuard<'_> {
        TranscriptGuard {
            transcript: self.transcript.lock().await,
            published: &self.published,
        }
    }

    /// Copy of the transcript as of the last append. Does not wait for an
    /// in-flight turn; its user turn is already included.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Exclusive handle on a session's transcript. Appends are mirrored to the
/// copy served by [`Session::snapshot`].
pub struct TranscriptGuard<'a> {
    transcript: MutexGuard<'a, Transcript>,
    published: &'a RwLock<Vec<Turn>>,
}

impl TranscriptGuard<'_> {
    pub fn push(&mut self, turn: Turn) {
        self.published
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(turn.clone());
        self.transcript.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        self.transcript.turns()
    }

    pub fn len(&self) -> usize {
        self.transcript.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_appends_in_order() {
        let mut transcript = Transcript::default();
        assert_eq!(transcript.len(), 0);

        transcript.push(Turn::user("hola"));
        transcript.push(Turn::assistant("hola, ¿cómo estás?"));

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.turns()[0], Turn::user("hola"));
        assert_eq!(transcript.turns()[1].speaker, Speaker::Assistant);
    }

    #[test]
    fn test_turn_serializes_with_snake_case_speaker() {
        let json = serde_json::to_value(Turn::assistant("ok")).unwrap();
        assert_eq!(json, serde_json::json!({"speaker": "assistant", "text": "ok"}));
    }

    #[tokio::test]
    async fn test_session_snapshot_is_a_copy() {
        let session = Session::new("s1");
        session.lock().await.push(Turn::user("uno"));

        let snapshot = session.snapshot();
        session.lock().await.push(Turn::assistant("dos"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(session.snapshot().len(), 2);
        assert_eq!(session.len(), 2);
        assert_eq!(session.id(), "s1");
    }

    #[tokio::test]
    async fn test_snapshot_does_not_wait_for_turn_in_flight() {
        let session = Session::new("s1");
        let mut guard = session.lock().await;
        guard.push(Turn::user("hola"));

        assert!(session.is_busy());
        assert_eq!(session.snapshot(), vec![Turn::user("hola")]);

        drop(guard);
        assert!(!session.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_time_resets_on_touch() {
        let session = Session::new("s1");
        tokio::time::advance(Duration::from_secs(90)).await;
        assert_eq!(session.idle_for(), Duration::from_secs(90));

        session.touch();
        assert_eq!(session.idle_for(), Duration::ZERO);
    }
}
