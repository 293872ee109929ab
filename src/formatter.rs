//! Turns a validated submission into the chat message posted to Discord.
//!
//! Formatting is pure: given the same input and timestamp it always yields
//! the same message. Only `format_submission_now` reads the clock.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::submission::SubmissionInput;

pub const HEADLINE: &str = "💌 New Feedback Received";
pub const DESCRIPTION: &str = "✨ **Someone submitted new feedback!**";
pub const ACCENT_COLOR: u32 = 0x5865F2;
pub const FOOTER: &str = "📩 From Web Feedback Form";
pub const SERVER_LINK_PLACEHOLDER: &str = "_Not provided_";

const USERNAME_LABEL: &str = "👤 Username ⬇️";
const SERVER_LINK_LABEL: &str = "🌐 Server Link ⬇️";
const FEEDBACK_LABEL: &str = "📝 Feedback ⬇️";
const QUOTE_MARKER: &str = "> ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub headline: String,
    pub description: String,
    pub sections: Vec<Section>,
    pub color: u32,
    pub footer: String,
    /// ISO-8601 UTC, millisecond precision.
    pub timestamp: String,
}

/// Discord embed object as it appears on the wire.
#[derive(Debug, Serialize)]
pub struct Embed<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub color: u32,
    pub fields: Vec<EmbedField<'a>>,
    pub footer: EmbedFooter<'a>,
    pub timestamp: &'a str,
}

#[derive(Debug, Serialize)]
pub struct EmbedField<'a> {
    pub name: &'a str,
    pub value: &'a str,
    pub inline: bool,
}

#[derive(Debug, Serialize)]
pub struct EmbedFooter<'a> {
    pub text: &'a str,
}

impl ChatMessage {
    pub fn to_embed(&self) -> Embed<'_> {
        Embed {
            title: &self.headline,
            description: &self.description,
            color: self.color,
            fields: self
                .sections
                .iter()
                .map(|s| EmbedField {
                    name: &s.label,
                    value: &s.value,
                    inline: false,
                })
                .collect(),
            footer: EmbedFooter { text: &self.footer },
            timestamp: &self.timestamp,
        }
    }

    pub fn section(&self, label: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.value.as_str())
    }

    pub fn username_section(&self) -> Option<&str> {
        self.section(USERNAME_LABEL)
    }

    pub fn server_link_section(&self) -> Option<&str> {
        self.section(SERVER_LINK_LABEL)
    }

    pub fn feedback_section(&self) -> Option<&str> {
        self.section(FEEDBACK_LABEL)
    }
}

pub fn format_submission(input: &SubmissionInput, now: DateTime<Utc>) -> ChatMessage {
    let server_link = match input.server_link.as_deref() {
        Some(link) => link.to_string(),
        None => SERVER_LINK_PLACEHOLDER.to_string(),
    };

    ChatMessage {
        headline: HEADLINE.to_string(),
        description: DESCRIPTION.to_string(),
        sections: vec![
            Section {
                label: USERNAME_LABEL.to_string(),
                value: format!("`{}`", input.username),
            },
            Section {
                label: SERVER_LINK_LABEL.to_string(),
                value: server_link,
            },
            Section {
                label: FEEDBACK_LABEL.to_string(),
                value: block_quote(&input.feedback),
            },
        ],
        color: ACCENT_COLOR,
        footer: FOOTER.to_string(),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

pub fn format_submission_now(input: &SubmissionInput) -> ChatMessage {
    format_submission(input, Utc::now())
}

/// Quote every line. Only `\n` is rewritten, so a `\r\n` line ending keeps
/// its `\r` in front of the next marker.
pub fn block_quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + QUOTE_MARKER.len() * 2);
    out.push_str(QUOTE_MARKER);
    out.push_str(&text.replace('\n', "\n> "));
    out
}
