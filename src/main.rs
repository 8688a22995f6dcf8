//! Crisis-aware chat companion
//!
//! A chat front-end for students that answers through a conversation
//! engine and raises an alert to human staff when a message reads as a
//! crisis.

mod alert;
mod api;
mod aws;
mod config;
mod llm;
mod risk;
mod runtime;
mod system_prompt;

use alert::AlertDispatcher;
use api::{create_router, AppState};
use aws::{ComprehendClient, SnsClient};
use config::AppConfig;
use llm::{GeminiService, LlmService, LoggingService};
use risk::{RiskDetector, RiskPhrases};
use runtime::{
    ComprehendClassifier, EngineLlmClient, SessionManager, SnsNotifier, TurnHandler,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crisis_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env();

    // Data loaded once at startup
    let phrases = match &config.risk_phrases_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading risk phrases");
            RiskPhrases::load(path)?
        }
        None => RiskPhrases::default(),
    };
    let system_prompt = system_prompt::load_system_prompt(config.system_prompt_path.as_deref())?;

    // Conversation engine
    let engine: Option<Arc<dyn LlmService>> = match &config.gemini.api_key {
        Some(key) => {
            let gemini = GeminiService::new(
                key.clone(),
                &config.gemini.model,
                config.gemini.base_url.as_deref(),
                config.timeouts.engine,
            );
            tracing::info!(model = %config.gemini.model, "Conversation engine configured");
            Some(Arc::new(LoggingService::new(Arc::new(gemini))))
        }
        None => {
            tracing::warn!("GEMINI_API_KEY not set; every turn will return the fallback message");
            None
        }
    };

    // AWS collaborators
    let (comprehend, sns) = match &config.aws.credentials {
        Some(creds) => (
            Some(ComprehendClient::new(
                creds.clone(),
                &config.aws.region,
                config.aws.comprehend_endpoint.as_deref(),
            )?),
            Some(SnsClient::new(
                creds.clone(),
                &config.aws.region,
                config.aws.sns_endpoint.as_deref(),
            )?),
        ),
        None => {
            tracing::warn!(
                "AWS credentials not set; sentiment checks fail open and alerts cannot be sent"
            );
            (None, None)
        }
    };
    if config.aws.sns_topic_arn.is_none() {
        tracing::warn!("SNS_TOPIC_ARN not set; crisis alerts will not be delivered");
    }

    let detector = RiskDetector::new(
        Arc::new(ComprehendClassifier::new(
            comprehend,
            config.aws.language_code.clone(),
        )),
        phrases,
        config.timeouts.classifier,
    );
    if detector.phrases().is_empty() {
        tracing::warn!("Risk phrase list is empty; no message will ever raise an alert");
    } else {
        tracing::info!(phrases = detector.phrases().len(), "Risk detector ready");
    }
    let dispatcher = AlertDispatcher::new(
        Arc::new(SnsNotifier::new(sns, config.aws.sns_topic_arn.clone())),
        config.timeouts.notifier,
    );
    let handler = TurnHandler::new(
        detector,
        dispatcher,
        Arc::new(EngineLlmClient::new(engine)),
        system_prompt,
        config.timeouts.engine,
    );

    // Create application state
    let state = AppState::new(SessionManager::new(handler));
    let runtime = state.runtime.clone();
    runtime.spawn_idle_sweep(config.timeouts.session_idle);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Crisis chat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    runtime.drain_alerts().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
