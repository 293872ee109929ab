//! Server-to-server captcha verification.

use serde_json::Value;

use crate::error::{MissingSetting, RelayError};

pub const DEFAULT_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    pub passed: bool,
    /// Raw provider response, kept for logging.
    pub provider_diagnostics: Value,
}

/// Confirms a client-supplied token with a verification provider.
#[async_trait::async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// Fails with `ServerMisconfigured` when a call could not be made at all.
    fn ensure_configured(&self) -> Result<(), RelayError>;

    /// Only ever returns `Ok` for a passing result.
    async fn verify(&self, token: &str) -> Result<VerificationResult, RelayError>;
}

/// reCAPTCHA `siteverify` client.
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    endpoint: String,
    secret: Option<String>,
}

impl RecaptchaVerifier {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            secret: secret.filter(|s| !s.trim().is_empty()),
        }
    }
}

#[async_trait::async_trait]
impl CaptchaVerifier for RecaptchaVerifier {
    fn ensure_configured(&self) -> Result<(), RelayError> {
        match self.secret {
            Some(_) => Ok(()),
            None => Err(RelayError::ServerMisconfigured(
                MissingSetting::RecaptchaSecret,
            )),
        }
    }

    async fn verify(&self, token: &str) -> Result<VerificationResult, RelayError> {
        let secret = self
            .secret
            .as_deref()
            .ok_or(RelayError::ServerMisconfigured(MissingSetting::RecaptchaSecret))?;

        let resp = self
            .client
            .post(&self.endpoint)
            .form(&[("secret", secret), ("response", token)])
            .send()
            .await
            .map_err(RelayError::VerificationUnreachable)?;
        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .map_err(RelayError::VerificationUnreachable)?;
        tracing::debug!(status = status.as_u16(), "captcha provider responded");

        let passed = body.get("success").and_then(Value::as_bool).unwrap_or(false);
        if !passed {
            return Err(RelayError::VerificationRejected { diagnostics: body });
        }
        Ok(VerificationResult {
            passed,
            provider_diagnostics: body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_secret_counts_as_unset() {
        let v = RecaptchaVerifier::new(reqwest::Client::new(), DEFAULT_VERIFY_URL, Some("  ".into()));
        assert!(matches!(
            v.ensure_configured(),
            Err(RelayError::ServerMisconfigured(MissingSetting::RecaptchaSecret))
        ));
    }

    #[tokio::test]
    async fn verify_without_secret_makes_no_call() {
        // Unroutable endpoint: reaching the network would surface as Unreachable.
        let v = RecaptchaVerifier::new(reqwest::Client::new(), "http://127.0.0.1:1/verify", None);
        let err = v.verify("token").await.unwrap_err();
        assert!(matches!(
            err,
            RelayError::ServerMisconfigured(MissingSetting::RecaptchaSecret)
        ));
    }

    #[tokio::test]
    async fn unreachable_provider_is_reported() {
        let v = RecaptchaVerifier::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1/verify",
            Some("s3cret".into()),
        );
        let err = v.verify("token").await.unwrap_err();
        assert!(matches!(err, RelayError::VerificationUnreachable(_)));
    }
}
