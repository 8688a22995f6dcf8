//! Crisis alert dispatch
//!
//! Alerts go out on a detached task. The turn that triggered one never
//! waits for it and never sees its failure; operators see failures in the
//! logs and in the health counters.

use crate::runtime::Notifier;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// SNS only accepts ASCII subjects, hence no emoji here
pub const ALERT_SUBJECT: &str = "Posible alerta emocional en chatbot";

/// Notification built from one risky user message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvent {
    pub original_message: String,
    pub subject: String,
    pub body: String,
}

impl AlertEvent {
    pub fn new(message: &str) -> Self {
        Self {
            original_message: message.to_string(),
            subject: ALERT_SUBJECT.to_string(),
            body: alert_body(message),
        }
    }
}

/// Fixed template embedding the triggering message verbatim
pub fn alert_body(message: &str) -> String {
    format!(
        "🚨 Alerta emocional detectada:\n\n\
         Mensaje preocupante: \"{message}\"\n\
         Se recomienda contactar al estudiante o tomar medidas de apoyo inmediato."
    )
}

#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("Notification channel not configured")]
    NotConfigured,
    #[error("Notification timed out after {0:?}")]
    Timeout(Duration),
    #[error("Notification publish failed: {0}")]
    Publish(String),
}

/// Operator-facing delivery counters
#[derive(Debug, Default)]
pub struct AlertStats {
    sent: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertStatsSnapshot {
    pub alerts_sent: u64,
    pub alerts_failed: u64,
}

impl AlertStats {
    pub fn snapshot(&self) -> AlertStatsSnapshot {
        AlertStatsSnapshot {
            alerts_sent: self.sent.load(Ordering::Relaxed),
            alerts_failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Sends alert events through a [`Notifier`] on background tasks
pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
    stats: Arc<AlertStats>,
    timeout: Duration,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, timeout: Duration) -> Self {
        Self {
            notifier,
            stats: Arc::new(AlertStats::default()),
            timeout,
        }
    }

    pub fn stats(&self) -> AlertStatsSnapshot {
        self.stats.snapshot()
    }

    /// Spawn delivery of an alert for `message`. The returned handle is the
    /// alert's own error channel; callers may drop it.
    pub fn dispatch(&self, message: &str) -> JoinHandle<Result<(), DispatchError>> {
        let event = AlertEvent::new(message);
        let notifier = self.notifier.clone();
        let stats = self.stats.clone();
        let limit = self.timeout;

        tokio::spawn(async move {
            tracing::debug!(message = %event.original_message, "Publishing crisis alert");
            let result = match timeout(limit, notifier.publish(&event.subject, &event.body)).await
            {
                Ok(result) => result,
                Err(_) => Err(DispatchError::Timeout(limit)),
            };

            match &result {
                Ok(()) => {
                    stats.sent.fetch_add(1, Ordering::Relaxed);
                    tracing::info!("Crisis alert published");
                }
                Err(DispatchError::NotConfigured) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("No alert channel configured, crisis alert dropped");
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(error = %e, "Crisis alert could not be delivered");
                }
            }
            result
        })
    }
}
