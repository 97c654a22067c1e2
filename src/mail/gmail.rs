//! Gmail REST v1 client: the production `MailboxProvider`.
//!
//! Credentials arrive per call; this client holds no token state and never
//! refreshes. A rejected token surfaces as `MailboxError::AuthFailed` so the
//! session layer can refresh and retry.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::debug;

use crate::config::MailboxConfig;
use crate::error::MailboxError;

use super::provider::MailboxProvider;
use super::types::{MailboxCredentials, RawMessage, SentMessage};

/// Response of `GET /messages`.
#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Option<Vec<MessageRef>>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

/// Gmail API client.
pub struct GmailProvider {
    client: Client,
    base_url: String,
}

impl GmailProvider {
    /// Create a client for the configured base URL with a bounded timeout.
    pub fn new(config: &MailboxConfig) -> Result<Self, MailboxError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MailboxError::transient("client setup", e))?;

        Ok(Self {
            client,
            base_url: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl MailboxProvider for GmailProvider {
    async fn list_messages(
        &self,
        credentials: &MailboxCredentials,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<String>, MailboxError> {
        let max = max_results.to_string();
        let resp = self
            .client
            .get(self.url("messages"))
            .bearer_auth(credentials.access_token.expose_secret())
            .query(&[("q", query), ("maxResults", max.as_str())])
            .send()
            .await
            .map_err(|e| classify_transport("list", e))?;

        let list: ListResponse = read_json("list", None, resp).await?;
        let ids: Vec<String> = list
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| m.id)
            .take(max_results as usize)
            .collect();

        debug!(count = ids.len(), query = query, "Listed messages");
        Ok(ids)
    }

    async fn get_message(
        &self,
        credentials: &MailboxCredentials,
        id: &str,
    ) -> Result<RawMessage, MailboxError> {
        validate_message_id(id)?;

        let resp = self
            .client
            .get(self.url(&format!("messages/{id}")))
            .bearer_auth(credentials.access_token.expose_secret())
            .query(&[("format", "full")])
            .send()
            .await
            .map_err(|e| classify_transport("get", e))?;

        read_json("get", Some(id), resp).await
    }

    async fn modify_labels(
        &self,
        credentials: &MailboxCredentials,
        id: &str,
        add: &[&str],
        remove: &[&str],
    ) -> Result<(), MailboxError> {
        validate_message_id(id)?;

        let resp = self
            .client
            .post(self.url(&format!("messages/{id}/modify")))
            .bearer_auth(credentials.access_token.expose_secret())
            .json(&serde_json::json!({
                "addLabelIds": add,
                "removeLabelIds": remove,
            }))
            .send()
            .await
            .map_err(|e| classify_transport("modify", e))?;

        let _: serde_json::Value = read_json("modify", Some(id), resp).await?;
        Ok(())
    }

    async fn send_message(
        &self,
        credentials: &MailboxCredentials,
        raw: &str,
        thread_id: Option<&str>,
    ) -> Result<SentMessage, MailboxError> {
        let mut body = serde_json::json!({ "raw": raw });
        if let Some(thread_id) = thread_id.filter(|t| !t.is_empty()) {
            body["threadId"] = serde_json::Value::String(thread_id.to_string());
        }

        let resp = self
            .client
            .post(self.url("messages/send"))
            .bearer_auth(credentials.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport("send", e))?;

        read_json("send", None, resp).await
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Gmail IDs are URL-safe tokens. Anything else could alter the request
/// path or query, so it is treated as an unknown message.
fn validate_message_id(id: &str) -> Result<(), MailboxError> {
    let url_safe = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    if id.is_empty() || !id.chars().all(url_safe) {
        return Err(MailboxError::NotFound { id: id.to_string() });
    }
    Ok(())
}

/// Classify a transport-level failure. Everything here is retryable.
fn classify_transport(operation: &str, err: reqwest::Error) -> MailboxError {
    let reason = if err.is_timeout() {
        format!("timed out: {err}")
    } else {
        err.to_string()
    };
    MailboxError::transient(operation, reason)
}

/// Classify an HTTP status from the provider.
pub fn classify_status(
    operation: &str,
    id: Option<&str>,
    status: StatusCode,
    body: &str,
) -> MailboxError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => MailboxError::AuthFailed {
            reason: format!("{operation} returned {status}"),
        },
        StatusCode::NOT_FOUND => MailboxError::NotFound {
            id: id.unwrap_or_default().to_string(),
        },
        _ => MailboxError::Transient {
            operation: operation.to_string(),
            reason: format!("{status}: {}", body.chars().take(200).collect::<String>()),
        },
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    operation: &str,
    id: Option<&str>,
    resp: Response,
) -> Result<T, MailboxError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(classify_status(operation, id, status, &body));
    }

    resp.json::<T>()
        .await
        .map_err(|e| MailboxError::InvalidResponse {
            operation: operation.to_string(),
            reason: e.to_string(),
        })
}
