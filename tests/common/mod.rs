#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use feedback_relay::{app, build_state, AppConfig};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Tracks environment variable mutations and restores originals on drop.
pub struct EnvGuard {
    originals: HashMap<String, Option<String>>,
}

impl EnvGuard {
    pub fn new() -> Self {
        Self {
            originals: HashMap::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.capture(key);
        std::env::set_var(key, value);
    }

    pub fn set_many(&mut self, entries: &[(&str, &str)]) {
        for (key, value) in entries {
            self.set(key, value);
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.capture(key);
        std::env::remove_var(key);
    }

    fn capture(&mut self, key: &str) {
        if self.originals.contains_key(key) {
            return;
        }
        let original = std::env::var(key).ok();
        self.originals.insert(key.to_string(), original);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, original) in self.originals.drain() {
            match original {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}

/// Stand-in for a Discord webhook: records every JSON body and answers with
/// a fixed status.
pub struct MockWebhook {
    pub url: String,
    pub status: u16,
    hits: AtomicUsize,
    bodies: Mutex<Vec<serde_json::Value>>,
}

impl MockWebhook {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<serde_json::Value> {
        self.bodies.lock().unwrap().clone()
    }
}

pub async fn start_mock_webhook(status: u16) -> Arc<MockWebhook> {
    async fn receive(
        State(hook): State<Arc<MockWebhook>>,
        Json(body): Json<serde_json::Value>,
    ) -> (StatusCode, String) {
        hook.hits.fetch_add(1, Ordering::SeqCst);
        hook.bodies.lock().unwrap().push(body);
        let status = StatusCode::from_u16(hook.status).unwrap();
        let text = if status.is_success() {
            String::new()
        } else {
            r#"{"message": "Unknown Webhook", "code": 10015}"#.to_string()
        };
        (status, text)
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hook = Arc::new(MockWebhook {
        url: format!("http://{}/api/webhooks/1/abc", addr),
        status,
        hits: AtomicUsize::new(0),
        bodies: Mutex::new(Vec::new()),
    });
    let router = Router::new()
        .route("/api/webhooks/1/abc", post(receive))
        .with_state(hook.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    hook
}

/// Stand-in for the reCAPTCHA siteverify endpoint.
pub struct MockCaptcha {
    pub url: String,
    pub reply: serde_json::Value,
    /// Non-JSON body sent with a 200 in place of `reply`.
    raw_reply: Option<&'static str>,
    hits: AtomicUsize,
    forms: Mutex<Vec<HashMap<String, String>>>,
}

impl MockCaptcha {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn forms(&self) -> Vec<HashMap<String, String>> {
        self.forms.lock().unwrap().clone()
    }
}

pub async fn start_mock_captcha(reply: serde_json::Value) -> Arc<MockCaptcha> {
    serve_mock_captcha(reply, None).await
}

/// Siteverify double that answers 200 with a body that is not JSON.
pub async fn start_garbled_captcha(body: &'static str) -> Arc<MockCaptcha> {
    serve_mock_captcha(serde_json::Value::Null, Some(body)).await
}

async fn serve_mock_captcha(
    reply: serde_json::Value,
    raw_reply: Option<&'static str>,
) -> Arc<MockCaptcha> {
    async fn siteverify(
        State(captcha): State<Arc<MockCaptcha>>,
        Form(form): Form<HashMap<String, String>>,
    ) -> Response {
        captcha.hits.fetch_add(1, Ordering::SeqCst);
        captcha.forms.lock().unwrap().push(form);
        match captcha.raw_reply {
            Some(raw) => (
                StatusCode::OK,
                [(axum::http::header::CONTENT_TYPE, "text/html")],
                raw,
            )
                .into_response(),
            None => Json(captcha.reply.clone()).into_response(),
        }
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captcha = Arc::new(MockCaptcha {
        url: format!("http://{}/recaptcha/api/siteverify", addr),
        reply,
        raw_reply,
        hits: AtomicUsize::new(0),
        forms: Mutex::new(Vec::new()),
    });
    let router = Router::new()
        .route("/recaptcha/api/siteverify", post(siteverify))
        .with_state(captcha.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    captcha
}

/// Port with nothing listening; connections are refused.
pub fn unreachable_url() -> String {
    "http://127.0.0.1:1/unreachable".to_string()
}

pub async fn spawn_app(config: AppConfig) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = build_state(config).unwrap();
    let app = app(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), handle)
}
