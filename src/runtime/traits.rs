//! Trait abstractions for the external collaborators
//!
//! These traits enable testing the turn handler with mock implementations.

use crate::alert::DispatchError;
use crate::aws::{ComprehendClient, SnsClient};
use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService};
use crate::risk::{ClassifierError, Sentiment};
use async_trait::async_trait;
use std::sync::Arc;

/// Sentiment analysis of a single message
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Sentiment, ClassifierError>;
}

/// Channel that delivers crisis alerts to people who can act on them
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, subject: &str, body: &str) -> Result<(), DispatchError>;
}

/// Client for making LLM requests
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete an LLM request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Comprehend as the sentiment classifier
pub struct ComprehendClassifier {
    client: Option<ComprehendClient>,
    language_code: String,
}

impl ComprehendClassifier {
    /// `None` when no AWS credentials are configured; every call then fails
    /// with [`ClassifierError::NotConfigured`].
    pub fn new(client: Option<ComprehendClient>, language_code: impl Into<String>) -> Self {
        Self {
            client,
            language_code: language_code.into(),
        }
    }
}

#[async_trait]
impl SentimentClassifier for ComprehendClassifier {
    async fn classify(&self, text: &str) -> Result<Sentiment, ClassifierError> {
        let client = self.client.as_ref().ok_or(ClassifierError::NotConfigured)?;
        let output = client
            .detect_sentiment(text, &self.language_code)
            .await
            .map_err(|e| ClassifierError::Request(e.to_string()))?;
        tracing::debug!(
            sentiment = %output.sentiment,
            scores = ?output.sentiment_score,
            "Sentiment classified"
        );

        Sentiment::from_label(&output.sentiment)
            .ok_or(ClassifierError::UnknownLabel(output.sentiment))
    }
}

/// SNS topic as the alert channel
pub struct SnsNotifier {
    client: Option<SnsClient>,
    topic_arn: Option<String>,
}

impl SnsNotifier {
    pub fn new(client: Option<SnsClient>, topic_arn: Option<String>) -> Self {
        Self { client, topic_arn }
    }
}

#[async_trait]
impl Notifier for SnsNotifier {
    async fn publish(&self, subject: &str, body: &str) -> Result<(), DispatchError> {
        let (Some(client), Some(topic_arn)) = (&self.client, &self.topic_arn) else {
            return Err(DispatchError::NotConfigured);
        };

        let message_id = client
            .publish(topic_arn, subject, body)
            .await
            .map_err(|e| DispatchError::Publish(e.to_string()))?;
        tracing::debug!(%message_id, topic = %topic_arn, "SNS publish accepted");
        Ok(())
    }
}

/// Adapter to use an optional [`LlmService`] as [`LlmClient`]
pub struct EngineLlmClient {
    service: Option<Arc<dyn LlmService>>,
    model_id: String,
}

impl EngineLlmClient {
    pub fn new(service: Option<Arc<dyn LlmService>>) -> Self {
        let model_id = service
            .as_ref()
            .map_or_else(|| "unconfigured".to_string(), |s| s.model_id().to_string());
        Self { service, model_id }
    }
}

#[async_trait]
impl LlmClient for EngineLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let llm = self
            .service
            .as_ref()
            .ok_or_else(|| LlmError::auth("No conversation engine configured"))?;
        llm.complete(request).await
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
