//! Mailbox provider abstraction: the lowest-level list/get/modify/send primitives.

use async_trait::async_trait;

use crate::error::MailboxError;

use super::types::{MailboxCredentials, RawMessage, SentMessage};

/// Label the provider uses to mark unread messages.
pub const UNREAD_LABEL: &str = "UNREAD";

/// Backend-agnostic mailbox provider.
///
/// Implementations classify every failure into a `MailboxError`; raw
/// transport errors never cross this boundary.
#[async_trait]
pub trait MailboxProvider: Send + Sync {
    /// IDs of messages matching `query`, in provider order, at most `max_results`.
    async fn list_messages(
        &self,
        credentials: &MailboxCredentials,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<String>, MailboxError>;

    /// Fetch a full message by ID.
    async fn get_message(
        &self,
        credentials: &MailboxCredentials,
        id: &str,
    ) -> Result<RawMessage, MailboxError>;

    /// Add and remove labels on a message.
    async fn modify_labels(
        &self,
        credentials: &MailboxCredentials,
        id: &str,
        add: &[&str],
        remove: &[&str],
    ) -> Result<(), MailboxError>;

    /// Send a base64url-encoded RFC 2822 message, optionally within a thread.
    async fn send_message(
        &self,
        credentials: &MailboxCredentials,
        raw: &str,
        thread_id: Option<&str>,
    ) -> Result<SentMessage, MailboxError>;
}
