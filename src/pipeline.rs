//! The per-request relay pipeline.
//!
//! `FeedbackPipeline` runs validate → verify (optional) → format → forward
//! and stops at the first failing stage. Configuration required by a
//! request's path is checked up front, so a misconfigured server never
//! issues a partial sequence of outbound calls.

use std::sync::Arc;

use axum::http::Method;

use crate::error::RelayError;
use crate::formatter::format_submission_now;
use crate::forwarder::{ForwardOutcome, WebhookForwarder};
use crate::submission::{self, SubmissionInput};
use crate::verifier::CaptchaVerifier;

#[derive(Clone)]
pub struct FeedbackPipeline {
    verification_enabled: bool,
    verifier: Arc<dyn CaptchaVerifier>,
    forwarder: Arc<dyn WebhookForwarder>,
}

impl FeedbackPipeline {
    pub fn new(
        verification_enabled: bool,
        verifier: Arc<dyn CaptchaVerifier>,
        forwarder: Arc<dyn WebhookForwarder>,
    ) -> Self {
        Self {
            verification_enabled,
            verifier,
            forwarder,
        }
    }

    pub fn verification_enabled(&self) -> bool {
        self.verification_enabled
    }

    /// Run one submission through every stage.
    pub async fn run(&self, method: &Method, body: &[u8]) -> Result<ForwardOutcome, RelayError> {
        let input = submission::validate(method, body, self.verification_enabled)?;

        self.forwarder.ensure_configured()?;
        if self.verification_enabled {
            self.verifier.ensure_configured()?;
            self.verify(&input).await?;
        }

        let message = format_submission_now(&input);
        let outcome = self.forwarder.forward(&message).await?;
        tracing::info!(provider_status = outcome.provider_status, "feedback delivered");
        Ok(outcome)
    }

    async fn verify(&self, input: &SubmissionInput) -> Result<(), RelayError> {
        let token = input
            .token
            .as_deref()
            .ok_or(RelayError::MissingVerificationToken)?;
        let result = self.verifier.verify(token).await?;
        tracing::debug!(diagnostics = %result.provider_diagnostics, "captcha passed");
        Ok(())
    }
}

/// Record operator-facing detail for a failed request. The caller only ever
/// sees `RelayError::public_message`.
pub fn log_failure(err: &RelayError) {
    match err {
        RelayError::MethodNotAllowed(method) => {
            tracing::debug!(%method, "rejected method");
        }
        RelayError::MalformedBody(e) => {
            tracing::warn!(error = %e, "invalid JSON body");
        }
        RelayError::UnreadableBody(detail) => {
            tracing::warn!(%detail, "failed to read request body");
        }
        RelayError::MissingRequiredField
        | RelayError::MissingVerificationToken
        | RelayError::PayloadTooLarge => {
            tracing::warn!(kind = err.kind(), "rejected submission");
        }
        RelayError::ServerMisconfigured(setting) => {
            tracing::error!(?setting, "required setting is not configured");
        }
        RelayError::VerificationUnreachable(e) => {
            tracing::error!(error = %e, "captcha verification error");
        }
        RelayError::VerificationRejected { diagnostics } => {
            tracing::warn!(%diagnostics, "captcha verification failed");
        }
        RelayError::ForwardUnreachable(e) => {
            tracing::error!(error = %e, "webhook error");
        }
        RelayError::ForwardRejected { status, body } => {
            tracing::error!(status, body = %body, "discord webhook error");
        }
    }
}
