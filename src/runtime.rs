//! Runtime for conversation sessions
//!
//! Sessions live in process memory only. Each one owns its transcript;
//! nothing is shared between sessions.

mod session;
mod traits;
mod turn;

#[cfg(test)]
pub mod testing;

pub use session::{Session, Speaker, Turn};
pub use traits::*;
pub use turn::{TurnHandler, TurnOutcome, ENGINE_FALLBACK_MESSAGE};

use crate::alert::{AlertStatsSnapshot, DispatchError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Upper bound between idle sweeps
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
}

/// Manager for all live sessions
pub struct SessionManager {
    handler: Arc<TurnHandler>,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    /// Alert deliveries not yet known to be finished
    pending_alerts: Mutex<Vec<JoinHandle<Result<(), DispatchError>>>>,
    classifier_failures: AtomicU64,
}

impl SessionManager {
    pub fn new(handler: TurnHandler) -> Self {
        Self {
            handler: Arc::new(handler),
            sessions: RwLock::new(HashMap::new()),
            pending_alerts: Mutex::new(Vec::new()),
            classifier_failures: AtomicU64::new(0),
        }
    }

    /// Start a session with an empty transcript
    pub async fn create(&self) -> Arc<Session> {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Session::new(id.clone()));
        self.sessions.write().await.insert(id, session.clone());
        tracing::info!(session_id = %session.id(), "Session started");
        session
    }

    pub async fn get(&self, session_id: &str) -> Result<Arc<Session>, SessionError> {
        let session = self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        session.touch();
        Ok(session)
    }

    /// Tear down a session, dropping its transcript. A turn still in flight
    /// finishes on its own copy of the session.
    pub async fn end(&self, session_id: &str) -> Result<(), SessionError> {
        let removed = self.sessions.write().await.remove(session_id);
        match removed {
            Some(session) => {
                tracing::info!(%session_id, turns = session.len(), "Session ended");
                Ok(())
            }
            None => Err(SessionError::NotFound(session_id.to_string())),
        }
    }

    /// Run one turn on a session. Turns on the same session queue behind
    /// each other; different sessions run concurrently.
    pub async fn submit(&self, session_id: &str, text: &str) -> Result<TurnOutcome, SessionError> {
        let session = self.get(session_id).await?;
        let mut outcome = self.handler.submit(&session, text).await;
        session.touch();

        if outcome.risk.classifier_error.is_some() {
            self.classifier_failures.fetch_add(1, Ordering::Relaxed);
        }
        tracing::info!(
            %session_id,
            at_risk = outcome.risk.at_risk,
            sentiment = ?outcome.risk.sentiment,
            classifier_failed = outcome.risk.classifier_error.is_some(),
            engine_failed = outcome.engine_error.is_some(),
            "Turn completed"
        );

        if let Some(alert) = outcome.alert.take() {
            let mut pending = self
                .pending_alerts
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            pending.retain(|handle| !handle.is_finished());
            pending.push(alert);
        }
        Ok(outcome)
    }

    /// Drop sessions idle for longer than `ttl`. Sessions with a turn in
    /// flight are kept. Returns how many were removed.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.is_busy() || session.idle_for() <= ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    /// Periodically evict sessions idle for longer than `ttl`
    pub fn spawn_idle_sweep(self: &Arc<Self>, ttl: Duration) -> JoinHandle<()> {
        let manager = Arc::downgrade(self);
        let period = ttl.min(MAX_SWEEP_INTERVAL);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                manager.evict_idle(ttl).await;
            }
        })
    }

    /// Wait for alert deliveries still in flight
    pub async fn drain_alerts(&self) {
        let pending = std::mem::take(
            &mut *self
                .pending_alerts
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        if pending.is_empty() {
            return;
        }
        tracing::info!(count = pending.len(), "Waiting for pending crisis alerts");
        for handle in pending {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Crisis alert task panicked");
            }
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub fn alert_stats(&self) -> AlertStatsSnapshot {
        self.handler.dispatcher().stats()
    }

    /// Turns whose sentiment check failed and were treated as not at risk
    pub fn classifier_failures(&self) -> u64 {
        self.classifier_failures.load(Ordering::Relaxed)
    }
}
