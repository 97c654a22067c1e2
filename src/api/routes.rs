//! REST endpoints for the inbox reply pipeline.
//!
//! Handlers only extract the session and arguments, call the orchestrator,
//! and serialize the result.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, Query, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::debug;

use super::error::ApiError;
use crate::drafts::{DraftOrchestrator, Tone};
use crate::error::MailboxError;
use crate::mail::{MailboxCredentials, SessionContext};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<DraftOrchestrator>,
}

/// Build the Axum router with the email and AI routes.
pub fn api_routes(orchestrator: Arc<DraftOrchestrator>) -> Router {
    let state = AppState { orchestrator };

    Router::new()
        .route("/health", get(health))
        .route("/api/emails/unread", get(list_unread))
        .route("/api/emails/batch", post(email_batch))
        .route("/api/emails/{id}/reply", post(send_reply))
        .route("/api/emails/{id}/read", post(mark_read))
        .route("/api/ai/generate-reply", post(generate_reply))
        .route("/api/ai/regenerate-reply", post(regenerate_reply))
        .with_state(state)
}

// ── Session ─────────────────────────────────────────────────────────────

pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";
pub const USER_ID_HEADER: &str = "x-user-id";

/// Per-request session built from the `Authorization: Bearer` token, the
/// optional refresh token header and the caller's user id.
pub struct Session(pub SessionContext);

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_from_headers(&parts.headers).map(Session)
    }
}

fn session_from_headers(headers: &HeaderMap) -> Result<SessionContext, ApiError> {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let token = header_str(header::AUTHORIZATION.as_str())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| MailboxError::AuthFailed {
            reason: "missing bearer token".into(),
        })?;

    let mut credentials = MailboxCredentials::new(token);
    if let Some(refresh) = header_str(REFRESH_TOKEN_HEADER) {
        credentials = credentials.with_refresh_token(refresh);
    }
    // Log label only; bookkeeping keys come from the token.
    let user_id = header_str(USER_ID_HEADER).unwrap_or("anonymous");

    Ok(SessionContext::new(user_id, credentials))
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "draftly",
    }))
}

// ── Emails ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnreadQuery {
    max_results: Option<u32>,
}

async fn list_unread(
    State(state): State<AppState>,
    Session(session): Session,
    Query(query): Query<UnreadQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let batch = state
        .orchestrator
        .list_unread(&session, query.max_results)
        .await?;
    debug!(count = batch.emails.len(), "Listed unread emails");
    Ok(Json(batch))
}

#[derive(Deserialize)]
struct BatchRequest {
    ids: Vec<String>,
}

async fn email_batch(
    State(state): State<AppState>,
    Session(session): Session,
    Json(body): Json<BatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let batch = state
        .orchestrator
        .get_email_batch(&session, &body.ids)
        .await?;
    Ok(Json(batch))
}

#[derive(Deserialize)]
struct ReplyRequest {
    content: String,
}

async fn send_reply(
    State(state): State<AppState>,
    Session(session): Session,
    Path(id): Path<String>,
    Json(body): Json<ReplyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .orchestrator
        .send_and_close(&session, &id, &body.content)
        .await?;
    Ok(Json(result))
}

async fn mark_read(
    State(state): State<AppState>,
    Session(session): Session,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.orchestrator.mark_read(&session, &id).await?;
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({"success": true, "emailId": id})),
    ))
}

// ── AI ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftRequest {
    email_id: String,
    #[serde(default)]
    tone: Option<String>,
}

impl DraftRequest {
    fn tone(&self) -> String {
        self.tone
            .clone()
            .unwrap_or_else(|| Tone::default().to_string())
    }
}

async fn generate_reply(
    State(state): State<AppState>,
    Session(session): Session,
    Json(body): Json<DraftRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .orchestrator
        .generate_draft(&session, &body.email_id, &body.tone())
        .await?;
    Ok(Json(outcome))
}

async fn regenerate_reply(
    State(state): State<AppState>,
    Session(session): Session,
    Json(body): Json<DraftRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .orchestrator
        .regenerate_draft(&session, &body.email_id, &body.tone())
        .await?;
    Ok(Json(outcome))
}
