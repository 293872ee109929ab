use std::env;

use anyhow::{anyhow, Result};

use crate::verifier::DEFAULT_VERIFY_URL;

pub const DEFAULT_ROUTE: &str = "/api/feedback";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Destination webhook. Absence is reported per request, not at startup.
    pub webhook_url: Option<String>,
    pub recaptcha_secret: Option<String>,
    pub verification_enabled: bool,
    pub verify_url: String,
    pub route: String,
    pub max_request_bytes: Option<usize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            recaptcha_secret: None,
            verification_enabled: false,
            verify_url: DEFAULT_VERIFY_URL.to_string(),
            route: DEFAULT_ROUTE.to_string(),
            max_request_bytes: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let webhook_url = parse_optional_string("WEBHOOK_URL")?;
        let recaptcha_secret = parse_optional_string("RECAPTCHA_SECRET_KEY")?;
        let verification_enabled = parse_bool_env("FEEDBACK_VERIFY_CAPTCHA")?.unwrap_or(false);
        let verify_url = parse_optional_string("RECAPTCHA_VERIFY_URL")?
            .unwrap_or_else(|| DEFAULT_VERIFY_URL.to_string());
        let route = parse_optional_string("FEEDBACK_ROUTE")?
            .unwrap_or_else(|| DEFAULT_ROUTE.to_string());
        if !route.starts_with('/') {
            return Err(anyhow!("FEEDBACK_ROUTE must start with '/'"));
        }
        let max_request_bytes =
            parse_optional_u64("FEEDBACK_MAX_REQUEST_BYTES")?.map(|v| v as usize);

        Ok(Self {
            webhook_url,
            recaptcha_secret,
            verification_enabled,
            verify_url,
            route,
            max_request_bytes,
        })
    }
}

fn parse_optional_string(var: &str) -> Result<Option<String>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(Some(value.trim().to_string())),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(anyhow!("{} is not valid unicode: {}", var, err)),
    }
}

fn parse_optional_u64(var: &str) -> Result<Option<u64>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a positive integer", var)),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn parse_bool_env(var: &str) -> Result<Option<bool>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => parse_bool(&value)
            .map(Some)
            .ok_or_else(|| anyhow!("{} must be a boolean (true/false/1/0)", var)),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
