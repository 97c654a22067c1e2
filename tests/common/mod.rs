//! Shared fixtures for integration tests: an in-process fake of the Gmail
//! REST API and a stub LLM provider.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use draftly::config::{DraftConfig, MailboxConfig};
use draftly::drafts::{DraftGenerator, DraftOrchestrator};
use draftly::error::LlmError;
use draftly::llm::provider::{CompletionRequest, CompletionResponse, LlmProvider};
use draftly::mail::{GmailProvider, MailboxGateway};

/// Maximum time any test is allowed to run before we consider it hung.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// The only access token the fake Gmail server accepts.
pub const GOOD_TOKEN: &str = "good-token";

pub const USERS_ME: &str = "/gmail/v1/users/me";

// ── Fake Gmail ──────────────────────────────────────────────────────────

#[derive(Default)]
pub struct GmailState {
    /// Full-format messages in listing order.
    pub messages: Vec<Value>,
    pub unread: HashSet<String>,
    /// IDs whose GET returns 500.
    pub failing: HashSet<String>,
    /// IDs whose GET returns a non-JSON body.
    pub garbled: HashSet<String>,
    pub fail_modify: bool,
    pub sent: Vec<Value>,
    pub get_calls: usize,
    pub last_list_query: HashMap<String, String>,
}

impl GmailState {
    pub fn add(&mut self, message: Value) {
        if let Some(id) = message["id"].as_str() {
            self.unread.insert(id.to_string());
        }
        self.messages.push(message);
    }

    fn find(&self, id: &str) -> Option<&Value> {
        self.messages.iter().find(|m| m["id"] == id)
    }
}

pub type SharedGmail = Arc<Mutex<GmailState>>;

/// A Gmail `format=full` message with `multipart/alternative` plain and
/// HTML parts.
pub fn gmail_message(id: &str, subject: &str, plain: &str, html: &str) -> Value {
    json!({
        "id": id,
        "threadId": format!("thread-{id}"),
        "snippet": plain.chars().take(40).collect::<String>(),
        "labelIds": ["UNREAD", "INBOX"],
        "payload": {
            "mimeType": "multipart/alternative",
            "headers": [
                {"name": "Subject", "value": subject},
                {"name": "From", "value": "Alice <alice@example.com>"},
                {"name": "To", "value": "me@example.com"},
                {"name": "Date", "value": "Tue, 14 Oct 2025 09:30:00 +0000"},
                {"name": "Message-ID", "value": format!("<{id}@mail.example.com>")},
            ],
            "body": {"size": 0},
            "parts": [
                {
                    "mimeType": "text/plain",
                    "headers": [],
                    "body": {"data": URL_SAFE_NO_PAD.encode(plain), "size": plain.len()},
                },
                {
                    "mimeType": "text/html",
                    "headers": [],
                    "body": {"data": URL_SAFE_NO_PAD.encode(html), "size": html.len()},
                },
            ],
        },
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {GOOD_TOKEN}"))
        .unwrap_or(false)
}

fn gmail_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"error": {"code": status.as_u16(), "message": message}})),
    )
        .into_response()
}

async fn list(
    State(state): State<SharedGmail>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return gmail_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }
    let mut state = state.lock().unwrap();
    let max = query
        .get("maxResults")
        .and_then(|m| m.parse::<usize>().ok())
        .unwrap_or(100);
    state.last_list_query = query;

    let refs: Vec<Value> = state
        .messages
        .iter()
        .filter(|m| m["id"].as_str().is_some_and(|id| state.unread.contains(id)))
        .take(max)
        .map(|m| json!({"id": m["id"], "threadId": m["threadId"]}))
        .collect();

    if refs.is_empty() {
        // Gmail omits `messages` entirely when nothing matches.
        return Json(json!({"resultSizeEstimate": 0})).into_response();
    }
    Json(json!({"messages": refs, "resultSizeEstimate": refs.len()})).into_response()
}

async fn get_message(
    State(state): State<SharedGmail>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return gmail_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }
    let mut state = state.lock().unwrap();
    state.get_calls += 1;
    if state.failing.contains(&id) {
        return gmail_error(StatusCode::INTERNAL_SERVER_ERROR, "Backend Error");
    }
    if state.garbled.contains(&id) {
        return (StatusCode::OK, "<html>not json</html>").into_response();
    }
    match state.find(&id) {
        Some(message) => Json(message.clone()).into_response(),
        None => gmail_error(StatusCode::NOT_FOUND, "Requested entity was not found."),
    }
}

async fn modify(
    State(state): State<SharedGmail>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return gmail_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }
    let mut state = state.lock().unwrap();
    if state.fail_modify {
        return gmail_error(StatusCode::SERVICE_UNAVAILABLE, "Backend Error");
    }
    if state.find(&id).is_none() {
        return gmail_error(StatusCode::NOT_FOUND, "Requested entity was not found.");
    }
    let removes_unread = body["removeLabelIds"]
        .as_array()
        .is_some_and(|labels| labels.iter().any(|l| l == "UNREAD"));
    if removes_unread {
        state.unread.remove(&id);
    }
    Json(json!({"id": id, "labelIds": ["INBOX"]})).into_response()
}

async fn send(
    State(state): State<SharedGmail>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return gmail_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }
    let mut state = state.lock().unwrap();
    let thread_id = body["threadId"].as_str().unwrap_or("new-thread").to_string();
    state.sent.push(body);
    let id = format!("sent-{}", state.sent.len());
    Json(json!({"id": id, "threadId": thread_id, "labelIds": ["SENT"]})).into_response()
}

/// Start a fake Gmail API on a random port. Returns the `users/me` base URL.
pub async fn start_fake_gmail() -> (String, SharedGmail) {
    let state: SharedGmail = Arc::new(Mutex::new(GmailState::default()));

    let app = Router::new()
        .route(&format!("{USERS_ME}/messages"), get(list))
        .route(&format!("{USERS_ME}/messages/send"), post(send))
        .route(&format!("{USERS_ME}/messages/{{id}}"), get(get_message))
        .route(&format!("{USERS_ME}/messages/{{id}}/modify"), post(modify))
        .with_state(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{port}{USERS_ME}"), state)
}

pub fn mailbox_config(base_url: &str) -> MailboxConfig {
    MailboxConfig {
        api_base: base_url.to_string(),
        timeout: Duration::from_secs(2),
        ..MailboxConfig::default()
    }
}

/// Decode the URL-safe base64 `raw` field of a recorded send.
pub fn decode_raw(sent: &Value) -> String {
    let raw = sent["raw"].as_str().expect("raw field");
    String::from_utf8(URL_SAFE_NO_PAD.decode(raw).expect("valid base64url")).expect("utf-8")
}

// ── Stub LLM ────────────────────────────────────────────────────────────

/// Stub LLM provider for integration tests (no real API calls).
pub struct StubLlm {
    pub reply: String,
    pub calls: AtomicUsize,
}

impl StubLlm {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CompletionResponse::text(self.reply.clone()))
    }
}

// ── App ─────────────────────────────────────────────────────────────────

pub struct TestApp {
    pub port: u16,
    pub gmail: SharedGmail,
    pub llm: Arc<StubLlm>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }
}

/// Start the Draftly HTTP app on a random port, backed by a fresh fake Gmail.
pub async fn start_app() -> TestApp {
    let (base_url, gmail) = start_fake_gmail().await;
    let llm = Arc::new(StubLlm::new("Thanks for reaching out. Friday works for me."));

    let config = mailbox_config(&base_url);
    let provider = Arc::new(GmailProvider::new(&config).unwrap());
    let gateway = Arc::new(MailboxGateway::new(provider, config));
    let generator = DraftGenerator::new(llm.clone(), DraftConfig::default());
    let orchestrator = Arc::new(DraftOrchestrator::new(gateway, generator));
    let app = draftly::api::app(orchestrator, "http://localhost:3000");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    TestApp { port, gmail, llm }
}
