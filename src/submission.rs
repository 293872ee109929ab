//! Inbound submission parsing and validation.

use axum::http::Method;
use serde_json::{Map, Value};

use crate::error::RelayError;

/// A validated feedback submission. Lives for one request only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionInput {
    pub username: String,
    pub server_link: Option<String>,
    pub feedback: String,
    pub token: Option<String>,
}

/// Check the method, decode the body and pull out the required fields.
///
/// The body is either a JSON object or a JSON string that itself encodes an
/// object (some form posters double-encode). `require_token` is set when
/// captcha verification is enabled.
pub fn validate(
    method: &Method,
    body: &[u8],
    require_token: bool,
) -> Result<SubmissionInput, RelayError> {
    if *method != Method::POST {
        return Err(RelayError::MethodNotAllowed(method.to_string()));
    }

    let fields = decode_body(body)?;

    let username = string_field(&fields, "username");
    let feedback = string_field(&fields, "feedback");
    let (username, feedback) = match (username, feedback) {
        (Some(u), Some(f)) => (u, f),
        _ => return Err(RelayError::MissingRequiredField),
    };

    let token = string_field(&fields, "token");
    if require_token && token.is_none() {
        return Err(RelayError::MissingVerificationToken);
    }

    Ok(SubmissionInput {
        username,
        server_link: string_field(&fields, "serverLink"),
        feedback,
        token,
    })
}

fn decode_body(body: &[u8]) -> Result<Map<String, Value>, RelayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    let value: Value = serde_json::from_slice(body).map_err(RelayError::MalformedBody)?;
    let value = match value {
        Value::String(inner) => {
            serde_json::from_str::<Value>(&inner).map_err(RelayError::MalformedBody)?
        }
        other => other,
    };
    match value {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

/// Non-empty string value of `key`; anything else counts as absent.
fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}
