//! Error types for Draftly.

use std::time::Duration;

/// Top-level error type returned by every upward-facing operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("All {} message fetches failed", failures.len())]
    BatchFailed { failures: Vec<FetchFailure> },

    #[error("A reply for email {email_id} is already being sent")]
    SendInProgress { email_id: String },
}

/// Coarse classification surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Network, timeout or 5xx. Safe to retry.
    Transient,
    /// Token rejected by the provider. The session layer must re-authenticate.
    Auth,
    /// Caller-fixable input problem, rejected before any network call.
    Validation,
    /// Every item in a batch fetch failed.
    PartialFetch,
    /// The provider does not know the requested message.
    NotFound,
    /// A conflicting operation is already in flight.
    Conflict,
    /// Misconfiguration of this service.
    Internal,
}

impl Error {
    /// Classify this error for the caller.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Config(_) => ErrorClass::Internal,
            Self::Mailbox(e) => e.class(),
            Self::Llm(e) => e.class(),
            Self::Validation(_) => ErrorClass::Validation,
            Self::BatchFailed { .. } => ErrorClass::PartialFetch,
            Self::SendInProgress { .. } => ErrorClass::Conflict,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::BatchFailed { failures } => failures
                .iter()
                .all(|f| f.error.class() == ErrorClass::Transient),
            other => matches!(other.class(), ErrorClass::Transient | ErrorClass::Conflict),
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from the mailbox provider, already classified.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MailboxError {
    #[error("Mailbox {operation} failed transiently: {reason}")]
    Transient { operation: String, reason: String },

    #[error("Mailbox rejected credentials: {reason}")]
    AuthFailed { reason: String },

    #[error("Message {id} not found")]
    NotFound { id: String },

    #[error("Invalid response from mailbox {operation}: {reason}")]
    InvalidResponse { operation: String, reason: String },
}

impl MailboxError {
    pub fn transient(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transient {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Transient { .. } | Self::InvalidResponse { .. } => ErrorClass::Transient,
            Self::AuthFailed { .. } => ErrorClass::Auth,
            Self::NotFound { .. } => ErrorClass::NotFound,
        }
    }
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited")]
    RateLimited { provider: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} returned an empty draft")]
    EmptyResponse { provider: String },
}

impl LlmError {
    pub fn class(&self) -> ErrorClass {
        match self {
            // The AI key belongs to this service, not the user session.
            Self::AuthFailed { .. } => ErrorClass::Internal,
            _ => ErrorClass::Transient,
        }
    }
}

/// Malformed input, always rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Reply text must not be empty")]
    EmptyReply,

    #[error("Unknown tone '{tone}' (expected professional, friendly, casual or concise)")]
    UnknownTone { tone: String },

    #[error("Original message has no sender to reply to")]
    MissingRecipient,

    #[error("Email id must not be empty")]
    EmptyEmailId,
}

/// One failed item of a batch fetch.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FetchFailure {
    pub id: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: MailboxError,
}

fn serialize_display<S: serde::Serializer>(
    error: &MailboxError,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Result type alias for Draftly.
pub type Result<T> = std::result::Result<T, Error>;
