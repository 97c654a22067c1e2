//! Mailbox data model: provider wire types, normalized views, envelopes, send results.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::FetchFailure;

// ── Credentials ─────────────────────────────────────────────────────

/// Per-request OAuth token pair supplied by the session collaborator.
///
/// Passed into every gateway call; never cached across requests.
#[derive(Debug, Clone)]
pub struct MailboxCredentials {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
}

impl MailboxCredentials {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(SecretString::from(refresh_token.into()));
        self
    }
}

/// Authenticated caller: user identity plus mailbox credentials.
///
/// `user_id` is caller-supplied and only used for logging. Per-session
/// bookkeeping is keyed on [`SessionContext::tracking_key`], which is
/// derived from the access token.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: String,
    pub credentials: MailboxCredentials,
    tracking_key: String,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>, credentials: MailboxCredentials) -> Self {
        let hash = Sha256::digest(credentials.access_token.expose_secret().as_bytes());
        Self {
            user_id: user_id.into(),
            tracking_key: format!("{:x}", hash)[..16].to_string(),
            credentials,
        }
    }

    /// Short hash of the access token identifying this session.
    pub fn tracking_key(&self) -> &str {
        &self.tracking_key
    }
}

// ── Provider wire types ─────────────────────────────────────────────

/// A single `name: value` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Body of a MIME part. `data` is base64 (URL-safe in Gmail's case).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default)]
    pub size: u64,
}

/// A node of the payload tree. The root node also carries the message headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: Option<PartBody>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl MessagePart {
    /// A leaf part with the given MIME type and base64 body data.
    pub fn leaf(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            headers: Vec::new(),
            body: Some(PartBody {
                data: Some(data.into()),
                size: 0,
            }),
            parts: Vec::new(),
        }
    }

    /// A multipart container.
    pub fn multipart(mime_type: impl Into<String>, parts: Vec<MessagePart>) -> Self {
        Self {
            mime_type: mime_type.into(),
            headers: Vec::new(),
            body: None,
            parts,
        }
    }

    /// Base64 body data carried directly by this part, if non-empty.
    pub fn body_data(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .filter(|d| !d.is_empty())
    }
}

/// Provider wire representation of one message (Gmail `format=full`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub label_ids: Vec<String>,
    #[serde(default)]
    pub payload: MessagePart,
}

impl RawMessage {
    /// Case-insensitive header lookup; the first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.payload.headers, name)
    }
}

/// Case-insensitive header lookup; the first match wins.
pub fn find_header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Provider acknowledgement of a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
}

// ── Normalized view ─────────────────────────────────────────────────

/// Caller-facing view of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEmail {
    pub id: String,
    pub thread_id: String,
    pub subject: String,
    pub from: String,
    pub to: String,
    pub date: String,
    pub snippet: String,
    /// Plain text, at most 500 chars plus a trailing `...` when truncated.
    pub body: String,
}

/// Result of fetching several messages. Failed items are omitted from
/// `emails` and recorded in `failures`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmailBatch {
    pub emails: Vec<NormalizedEmail>,
    pub failures: Vec<FetchFailure>,
}

impl EmailBatch {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

// ── Outgoing ────────────────────────────────────────────────────────

/// Threading-relevant headers of the message being replied to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginalHeaders {
    pub subject: String,
    pub from: String,
    pub message_id: String,
    pub references: String,
}

impl OriginalHeaders {
    /// Pull the threading headers out of a raw message. Absent headers are empty.
    pub fn from_raw(raw: &RawMessage) -> Self {
        Self {
            subject: raw.header("Subject").unwrap_or_default().to_string(),
            from: raw.header("From").unwrap_or_default().to_string(),
            message_id: raw.header("Message-ID").unwrap_or_default().to_string(),
            references: raw.header("References").unwrap_or_default().to_string(),
        }
    }
}

/// Transport-ready outgoing reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyEnvelope {
    pub to: String,
    pub subject: String,
    pub in_reply_to: String,
    pub references: String,
    pub body: String,
    /// URL-safe, unpadded base64 of the assembled message.
    pub raw: String,
}

/// Post-send mark-as-read progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HousekeepingState {
    /// Reply accepted; original not yet marked read.
    Pending,
    /// Original marked read.
    Done,
    /// Marking read failed; the reply was still delivered.
    Failed { reason: String },
}

/// Warning attached to a successful send whose housekeeping failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HousekeepingWarning {
    pub message: String,
}

/// Outcome of a send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    pub success: bool,
    pub sent_message_id: String,
    pub thread_id: String,
    pub original_marked_read: bool,
    pub housekeeping: HousekeepingState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<HousekeepingWarning>,
}
