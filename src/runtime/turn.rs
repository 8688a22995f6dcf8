//! One request/response cycle of a conversation

use super::session::{Session, Turn};
use super::traits::LlmClient;
use crate::alert::{AlertDispatcher, DispatchError};
use crate::llm::{LlmError, LlmRequest};
use crate::risk::{RiskAssessment, RiskDetector};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Shown to the user when the conversation engine could not answer
pub const ENGINE_FALLBACK_MESSAGE: &str =
    "Lo siento, no pude generar una respuesta en este momento. Por favor, inténtalo de nuevo.";

/// Result of one submitted message
#[derive(Debug)]
pub struct TurnOutcome {
    /// Transcript after the turn
    pub transcript: Vec<Turn>,
    pub risk: RiskAssessment,
    /// Delivery task of the alert, when one was raised. `SessionManager`
    /// takes it to await pending deliveries at shutdown.
    pub alert: Option<JoinHandle<Result<(), DispatchError>>>,
    /// Set when the engine failed; no assistant turn was appended
    pub engine_error: Option<LlmError>,
}

/// Runs turns: screen the message, alert if needed, ask the engine
pub struct TurnHandler {
    detector: RiskDetector,
    dispatcher: AlertDispatcher,
    llm_client: Arc<dyn LlmClient>,
    system_prompt: String,
    engine_timeout: Duration,
}

impl TurnHandler {
    pub fn new(
        detector: RiskDetector,
        dispatcher: AlertDispatcher,
        llm_client: Arc<dyn LlmClient>,
        system_prompt: impl Into<String>,
        engine_timeout: Duration,
    ) -> Self {
        Self {
            detector,
            dispatcher,
            llm_client,
            system_prompt: system_prompt.into(),
            engine_timeout,
        }
    }

    pub fn dispatcher(&self) -> &AlertDispatcher {
        &self.dispatcher
    }

    /// Process one user message against `session`.
    ///
    /// Holds the session's transcript for the whole turn; other turns on the
    /// session queue behind it while [`Session::snapshot`] readers do not.
    /// The risk decision looks only at `text`; the engine sees the full
    /// transcript ending with that message. An engine failure leaves the user
    /// turn in place and appends nothing.
    pub async fn submit(&self, session: &Session, text: &str) -> TurnOutcome {
        let mut transcript = session.lock().await;
        transcript.push(Turn::user(text));

        let risk = self.detector.assess(text).await;
        let alert = if risk.at_risk {
            tracing::warn!(
                session_id = %session.id(),
                phrase = risk.matched_phrase.as_deref().unwrap_or_default(),
                "Crisis risk detected, dispatching alert"
            );
            Some(self.dispatcher.dispatch(text))
        } else {
            None
        };

        tracing::debug!(
            session_id = %session.id(),
            turns = transcript.len(),
            "Requesting engine reply"
        );
        let request =
            LlmRequest::from_transcript(Some(self.system_prompt.as_str()), transcript.turns());
        let reply = match timeout(self.engine_timeout, self.llm_client.complete(&request)).await {
            Ok(Ok(response)) => {
                let reply = response.text.trim();
                if reply.is_empty() {
                    Err(LlmError::empty_response("Engine returned no text"))
                } else {
                    Ok(reply.to_string())
                }
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(LlmError::timeout(format!(
                "Engine did not answer within {:?}",
                self.engine_timeout
            ))),
        };

        let engine_error = match reply {
            Ok(reply) => {
                transcript.push(Turn::assistant(reply));
                None
            }
            Err(e) => {
                tracing::error!(
                    session_id = %session.id(),
                    model = %self.llm_client.model_id(),
                    error = %e,
                    kind = ?e.kind,
                    "Conversation engine failed, returning fallback message"
                );
                Some(e)
            }
        };

        TurnOutcome {
            transcript: transcript.turns().to_vec(),
            risk,
            alert,
            engine_error,
        }
    }
}
