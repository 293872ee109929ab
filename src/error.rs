//! Error taxonomy for the feedback pipeline.
//!
//! Every failure is caught where it is detected and rendered straight into a
//! `{"message": ...}` response. Provider diagnostics ride along in the
//! variants so the handler can log them, but `public_message` never includes
//! them.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Configuration value that was required but missing at the point of use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingSetting {
    WebhookUrl,
    RecaptchaSecret,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("method {0} not allowed")]
    MethodNotAllowed(String),

    #[error("malformed request body: {0}")]
    MalformedBody(#[source] serde_json::Error),

    #[error("missing username or feedback")]
    MissingRequiredField,

    #[error("missing verification token")]
    MissingVerificationToken,

    #[error("request body too large")]
    PayloadTooLarge,

    /// The body stream failed before it was fully read.
    #[error("unreadable request body: {0}")]
    UnreadableBody(String),

    #[error("server misconfigured: {0:?} is not set")]
    ServerMisconfigured(MissingSetting),

    #[error("verification provider unreachable: {0}")]
    VerificationUnreachable(#[source] reqwest::Error),

    #[error("verification rejected by provider")]
    VerificationRejected { diagnostics: serde_json::Value },

    #[error("webhook unreachable: {0}")]
    ForwardUnreachable(#[source] reqwest::Error),

    #[error("webhook rejected message with status {status}")]
    ForwardRejected { status: u16, body: String },
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MalformedBody(_)
            | Self::UnreadableBody(_)
            | Self::MissingRequiredField
            | Self::MissingVerificationToken
            | Self::VerificationRejected { .. } => StatusCode::BAD_REQUEST,
            Self::ServerMisconfigured(_)
            | Self::VerificationUnreachable(_)
            | Self::ForwardUnreachable(_)
            | Self::ForwardRejected { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short message returned to the caller.
    pub fn public_message(&self) -> String {
        match self {
            Self::MethodNotAllowed(_) => "Method not allowed".into(),
            Self::MalformedBody(_) => "Invalid JSON body".into(),
            Self::MissingRequiredField => "Missing username or feedback".into(),
            Self::MissingVerificationToken => "Missing reCAPTCHA token".into(),
            Self::PayloadTooLarge => "Request too large".into(),
            Self::UnreadableBody(_) => "Invalid request body".into(),
            Self::ServerMisconfigured(MissingSetting::WebhookUrl) => {
                "Server misconfigured (no WEBHOOK_URL)".into()
            }
            Self::ServerMisconfigured(MissingSetting::RecaptchaSecret) => {
                "Server misconfigured (no RECAPTCHA secret)".into()
            }
            Self::VerificationUnreachable(_) => "Captcha verification error".into(),
            Self::VerificationRejected { .. } => "Captcha verification failed".into(),
            Self::ForwardUnreachable(_) => "Error sending webhook".into(),
            Self::ForwardRejected { status, .. } => {
                format!("Discord webhook failed ({})", status)
            }
        }
    }

    /// Stable label used for the `kind` metric dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed(_) => "method_not_allowed",
            Self::MalformedBody(_) => "malformed_body",
            Self::MissingRequiredField => "missing_required_field",
            Self::MissingVerificationToken => "missing_verification_token",
            Self::PayloadTooLarge => "payload_too_large",
            Self::UnreadableBody(_) => "unreadable_body",
            Self::ServerMisconfigured(_) => "server_misconfigured",
            Self::VerificationUnreachable(_) => "verification_unreachable",
            Self::VerificationRejected { .. } => "verification_rejected",
            Self::ForwardUnreachable(_) => "forward_unreachable",
            Self::ForwardRejected { .. } => "forward_rejected",
        }
    }

    /// Every `kind()` label, in exposition order.
    pub const KINDS: [&'static str; 11] = [
        "method_not_allowed",
        "malformed_body",
        "missing_required_field",
        "missing_verification_token",
        "payload_too_large",
        "unreadable_body",
        "server_misconfigured",
        "verification_unreachable",
        "verification_rejected",
        "forward_unreachable",
        "forward_rejected",
    ];
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = MessageBody {
            message: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}
