//! Core library for the feedback relay.  This module wires the submission
//! pipeline into an axum router: one feedback endpoint plus health and
//! metrics routes.  Configuration is passed in explicitly so the whole
//! service can be exercised in tests without touching the environment.

mod config;
pub mod error;
pub mod formatter;
pub mod forwarder;
pub mod metrics;
pub mod pipeline;
pub mod submission;
pub mod verifier;

pub use config::{AppConfig, DEFAULT_ROUTE};
pub use error::{MissingSetting, RelayError};
pub use formatter::{format_submission, ChatMessage};
pub use forwarder::{DiscordWebhook, ForwardOutcome, WebhookForwarder};
pub use pipeline::FeedbackPipeline;
pub use submission::SubmissionInput;
pub use verifier::{CaptchaVerifier, RecaptchaVerifier, VerificationResult};

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{
    rejection::{BytesRejection, FailedToBufferBody},
    DefaultBodyLimit, State,
};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::metrics::RelayMetrics;

/// State shared across handlers.  Holds no per-request data.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: FeedbackPipeline,
    pub route: String,
    /// Maximum accepted raw request body size in bytes (None => axum default)
    pub max_request_bytes: Option<usize>,
    pub metrics: Arc<RelayMetrics>,
}

/// Build state from an explicit configuration.  A single HTTP client is
/// shared by the verifier and the forwarder.
pub fn build_state(config: AppConfig) -> anyhow::Result<AppState> {
    let AppConfig {
        webhook_url,
        recaptcha_secret,
        verification_enabled,
        verify_url,
        route,
        max_request_bytes,
    } = config;

    let client = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;

    if webhook_url.is_none() {
        tracing::warn!("WEBHOOK_URL not set; submissions will be rejected");
    }
    if verification_enabled && recaptcha_secret.is_none() {
        tracing::warn!("captcha verification enabled but RECAPTCHA_SECRET_KEY not set");
    }

    let verifier = RecaptchaVerifier::new(client.clone(), verify_url, recaptcha_secret);
    let forwarder = DiscordWebhook::new(client, webhook_url);
    let pipeline =
        FeedbackPipeline::new(verification_enabled, Arc::new(verifier), Arc::new(forwarder));

    Ok(AppState {
        pipeline,
        route,
        max_request_bytes,
        metrics: Arc::new(RelayMetrics::new()),
    })
}

/// Build state from environment variables.  See `AppConfig::from_env` for
/// the variables read.
pub fn build_state_from_env() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env()?;
    build_state(config)
}

/// Build the axum router.  The feedback route accepts every method so that
/// non-POST requests get the JSON 405 body rather than axum's empty one.
pub fn app(state: AppState) -> Router {
    let max_request_bytes = state.max_request_bytes;

    let router = Router::new()
        .route(&state.route, any(feedback_handler))
        .route("/healthz", get(healthz_handler))
        .route("/metrics", get(metrics_handler));

    let router = if let Some(limit) = max_request_bytes {
        router.layer(DefaultBodyLimit::max(limit))
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

async fn feedback_handler(
    State(state): State<AppState>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let start = Instant::now();
    let bytes = match body {
        Ok(bytes) => bytes,
        // A rejected body only matters once the method is known to be right.
        Err(_) if method != Method::POST => Bytes::new(),
        Err(rejection) => {
            let err = body_rejection_error(&state, rejection);
            return finish(&state, Err(err), start);
        }
    };

    let result = state.pipeline.run(&method, &bytes).await.map(|_| ());
    finish(&state, result, start)
}

fn finish(state: &AppState, result: Result<(), RelayError>, start: Instant) -> Response {
    let latency_ms = start.elapsed().as_millis() as u64;
    state.metrics.record(result.as_ref().map(|_| ()), latency_ms);
    match result {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "success": true }))).into_response(),
        Err(err) => {
            pipeline::log_failure(&err);
            err.into_response()
        }
    }
}

fn body_rejection_error(state: &AppState, rejection: BytesRejection) -> RelayError {
    match rejection {
        BytesRejection::FailedToBufferBody(FailedToBufferBody::LengthLimitError(_)) => {
            if let Some(limit) = state.max_request_bytes {
                tracing::warn!(limit, "request body exceeded configured limit");
            } else {
                tracing::warn!("request body exceeded default limit");
            }
            RelayError::PayloadTooLarge
        }
        other => RelayError::UnreadableBody(other.body_text()),
    }
}

/// Health endpoint for container readiness / liveness checks.
async fn healthz_handler(State(state): State<AppState>) -> Response {
    let json = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "verificationEnabled": state.pipeline.verification_enabled(),
    });
    (StatusCode::OK, Json(json)).into_response()
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4",
        )],
        state.metrics.render(),
    )
        .into_response()
}
