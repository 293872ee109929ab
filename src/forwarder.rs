//! Delivery of formatted messages to the destination webhook.

use serde::Serialize;

use crate::error::{MissingSetting, RelayError};
use crate::formatter::{ChatMessage, Embed};

pub const ANNOUNCEMENT: &str = "📬 **New Feedback!**";

/// A delivered message. Rejections carry the provider body in
/// `RelayError::ForwardRejected` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardOutcome {
    pub delivered: bool,
    pub provider_status: u16,
}

/// Wire envelope expected by Discord's execute-webhook endpoint.
#[derive(Debug, Serialize)]
pub struct WebhookEnvelope<'a> {
    pub content: &'a str,
    pub embeds: Vec<Embed<'a>>,
}

impl<'a> WebhookEnvelope<'a> {
    pub fn new(message: &'a ChatMessage) -> Self {
        Self {
            content: ANNOUNCEMENT,
            embeds: vec![message.to_embed()],
        }
    }
}

#[async_trait::async_trait]
pub trait WebhookForwarder: Send + Sync {
    fn ensure_configured(&self) -> Result<(), RelayError>;

    /// One attempt; failures are returned, never retried.
    async fn forward(&self, message: &ChatMessage) -> Result<ForwardOutcome, RelayError>;
}

pub struct DiscordWebhook {
    client: reqwest::Client,
    url: Option<String>,
}

impl DiscordWebhook {
    pub fn new(client: reqwest::Client, url: Option<String>) -> Self {
        Self {
            client,
            url: url.filter(|u| !u.trim().is_empty()),
        }
    }
}

#[async_trait::async_trait]
impl WebhookForwarder for DiscordWebhook {
    fn ensure_configured(&self) -> Result<(), RelayError> {
        match self.url {
            Some(_) => Ok(()),
            None => Err(RelayError::ServerMisconfigured(MissingSetting::WebhookUrl)),
        }
    }

    async fn forward(&self, message: &ChatMessage) -> Result<ForwardOutcome, RelayError> {
        let url = self
            .url
            .as_deref()
            .ok_or(RelayError::ServerMisconfigured(MissingSetting::WebhookUrl))?;

        let envelope = WebhookEnvelope::new(message);
        let resp = self
            .client
            .post(url)
            .json(&envelope)
            .send()
            .await
            .map_err(RelayError::ForwardUnreachable)?;

        let status = resp.status();
        if !status.is_success() {
            // Body is diagnostic only; an unreadable body must not mask the status.
            let body = resp.text().await.unwrap_or_default();
            return Err(RelayError::ForwardRejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(ForwardOutcome {
            delivered: true,
            provider_status: status.as_u16(),
        })
    }
}
