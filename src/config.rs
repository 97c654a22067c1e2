//! Configuration types, built from environment variables.

use std::time::Duration;

/// Default Gmail REST base for the authenticated user.
pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Mailbox provider configuration.
#[derive(Debug, Clone)]
pub struct MailboxConfig {
    /// Base URL of the Gmail users/me resource.
    pub api_base: String,
    /// Bounded timeout for every provider call.
    pub timeout: Duration,
    /// Default number of unread messages to list.
    pub max_results: u32,
    /// Provider search query selecting unread messages.
    pub unread_query: String,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            api_base: GMAIL_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
            max_results: 5,
            unread_query: "is:unread".to_string(),
        }
    }
}

impl MailboxConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_base = std::env::var("GMAIL_API_BASE").unwrap_or(defaults.api_base);

        let timeout = std::env::var("GMAIL_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        let max_results: u32 = std::env::var("GMAIL_MAX_RESULTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_results);

        Self {
            api_base,
            timeout,
            max_results,
            unread_query: defaults.unread_query,
        }
    }
}

/// Draft generation configuration.
#[derive(Debug, Clone)]
pub struct DraftConfig {
    /// Timeout for a single AI call.
    pub llm_timeout: Duration,
    /// LLM temperature for reply generation.
    pub temperature: f32,
    /// Max tokens for the generated reply.
    pub max_tokens: u32,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            llm_timeout: Duration::from_secs(60),
            temperature: 0.7,
            max_tokens: 512,
        }
    }
}

impl DraftConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let llm_timeout = std::env::var("DRAFTLY_LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.llm_timeout);
        Self {
            llm_timeout,
            ..defaults
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Browser origin allowed by CORS (the web client).
    pub cors_origin: String,
    /// Directory for daily rolling log files. Logs go to stderr when unset.
    pub log_dir: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port: u16 = std::env::var("DRAFTLY_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5000);

        let cors_origin = std::env::var("DRAFTLY_CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let log_dir = std::env::var("DRAFTLY_LOG_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Self {
            port,
            cors_origin,
            log_dir,
        }
    }
}
