//! Mailbox gateway: the only component that talks to the mailbox provider.
//!
//! Sending is an explicit two-step transition: `submit_reply` yields a
//! [`SentReply`] (housekeeping pending), and `complete_housekeeping` turns it
//! into a terminal [`SendResult`]. A failure in the second step never turns a
//! delivered reply into a failed send.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::MailboxConfig;
use crate::error::{Error, FetchFailure, MailboxError};

use super::compose::compose_reply;
use super::extract::normalize;
use super::provider::{MailboxProvider, UNREAD_LABEL};
use super::types::{
    EmailBatch, HousekeepingState, HousekeepingWarning, MailboxCredentials, NormalizedEmail,
    OriginalHeaders, SendResult, SentMessage,
};

/// A reply the provider accepted. The original is not yet marked read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReply {
    pub original_id: String,
    pub sent: SentMessage,
}

impl SentReply {
    pub fn state(&self) -> HousekeepingState {
        HousekeepingState::Pending
    }

    /// Original marked read.
    pub fn housekeeping_done(self) -> SendResult {
        SendResult {
            success: true,
            sent_message_id: self.sent.id,
            thread_id: self.sent.thread_id,
            original_marked_read: true,
            housekeeping: HousekeepingState::Done,
            warning: None,
        }
    }

    /// Marking read failed. The send still counts as a success.
    pub fn housekeeping_failed(self, error: &MailboxError) -> SendResult {
        let message = format!(
            "Reply sent, but message {} could not be marked read: {error}",
            self.original_id
        );
        SendResult {
            success: true,
            sent_message_id: self.sent.id,
            thread_id: self.sent.thread_id,
            original_marked_read: false,
            housekeeping: HousekeepingState::Failed {
                reason: error.to_string(),
            },
            warning: Some(HousekeepingWarning { message }),
        }
    }
}

/// Stable interface over a `MailboxProvider`.
pub struct MailboxGateway {
    provider: Arc<dyn MailboxProvider>,
    config: MailboxConfig,
}

impl MailboxGateway {
    pub fn new(provider: Arc<dyn MailboxProvider>, config: MailboxConfig) -> Self {
        Self { provider, config }
    }

    /// Default listing size from configuration.
    pub fn default_max_results(&self) -> u32 {
        self.config.max_results
    }

    /// IDs of unread messages in provider order, at most `max_results`.
    pub async fn list_unread(
        &self,
        credentials: &MailboxCredentials,
        max_results: u32,
    ) -> Result<Vec<String>, MailboxError> {
        let mut ids = self
            .provider
            .list_messages(credentials, &self.config.unread_query, max_results)
            .await?;
        ids.truncate(max_results as usize);

        if ids.is_empty() {
            info!("No unread messages found");
        } else {
            info!(count = ids.len(), "Found unread messages");
        }
        Ok(ids)
    }

    /// Fetch and normalize one message.
    pub async fn get_normalized(
        &self,
        credentials: &MailboxCredentials,
        id: &str,
    ) -> Result<NormalizedEmail, MailboxError> {
        let raw = self.provider.get_message(credentials, id).await?;
        Ok(normalize(&raw))
    }

    /// Fetch several messages concurrently.
    ///
    /// Output follows the order of `ids`, not completion order. Failed items
    /// are omitted from `emails` and recorded in `failures`.
    pub async fn get_batch(&self, credentials: &MailboxCredentials, ids: &[String]) -> EmailBatch {
        let fetches = ids.iter().map(|id| self.get_normalized(credentials, id));
        let results = join_all(fetches).await;

        let mut batch = EmailBatch::default();
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(email) => batch.emails.push(email),
                Err(error) => {
                    warn!(email_id = %id, error = %error, "Failed to fetch message");
                    batch.failures.push(FetchFailure {
                        id: id.clone(),
                        error,
                    });
                }
            }
        }
        batch
    }

    /// Remove the unread marker. Idempotent.
    pub async fn mark_read(
        &self,
        credentials: &MailboxCredentials,
        id: &str,
    ) -> Result<(), MailboxError> {
        self.provider
            .modify_labels(credentials, id, &[], &[UNREAD_LABEL])
            .await?;
        info!(email_id = %id, "Marked message read");
        Ok(())
    }

    /// Re-fetch the original, compose the reply and submit it in the original thread.
    pub async fn submit_reply(
        &self,
        credentials: &MailboxCredentials,
        original_id: &str,
        reply_text: &str,
    ) -> Result<SentReply, Error> {
        // Always fresh: threading headers must reflect the current message.
        let original = self.provider.get_message(credentials, original_id).await?;
        let headers = OriginalHeaders::from_raw(&original);
        let envelope = compose_reply(&headers, reply_text)?;

        let thread_id = Some(original.thread_id.as_str()).filter(|t| !t.is_empty());
        let sent = self
            .provider
            .send_message(credentials, &envelope.raw, thread_id)
            .await?;

        info!(
            email_id = %original_id,
            sent_id = %sent.id,
            to = %envelope.to,
            "Reply sent"
        );

        Ok(SentReply {
            original_id: original_id.to_string(),
            sent,
        })
    }

    /// Mark the original read after a confirmed send.
    pub async fn complete_housekeeping(
        &self,
        credentials: &MailboxCredentials,
        sent: SentReply,
    ) -> SendResult {
        debug!(
            email_id = %sent.original_id,
            state = ?sent.state(),
            "Marking original read"
        );
        match self.mark_read(credentials, &sent.original_id).await {
            Ok(()) => sent.housekeeping_done(),
            Err(e) => {
                warn!(
                    email_id = %sent.original_id,
                    error = %e,
                    "Reply delivered but original could not be marked read"
                );
                sent.housekeeping_failed(&e)
            }
        }
    }

    /// Send a reply and, once the provider accepted it, mark the original read.
    pub async fn send_reply(
        &self,
        credentials: &MailboxCredentials,
        original_id: &str,
        reply_text: &str,
    ) -> Result<SendResult, Error> {
        let sent = self
            .submit_reply(credentials, original_id, reply_text)
            .await?;
        Ok(self.complete_housekeeping(credentials, sent).await)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::*;
    use crate::mail::types::{Header, MessagePart, RawMessage};

    /// In-memory provider with switchable failures.
    #[derive(Default)]
    pub(crate) struct FakeMailbox {
        pub messages: Mutex<HashMap<String, RawMessage>>,
        pub order: Mutex<Vec<String>>,
        pub unread: Mutex<HashSet<String>>,
        pub failing_gets: Mutex<HashSet<String>>,
        pub fail_modify: Mutex<bool>,
        pub fail_send: Mutex<bool>,
        pub sent: Mutex<Vec<(String, Option<String>)>>,
        pub get_calls: Mutex<usize>,
    }

    impl FakeMailbox {
        pub fn insert(&self, raw: RawMessage) {
            self.order.lock().unwrap().push(raw.id.clone());
            self.unread.lock().unwrap().insert(raw.id.clone());
            self.messages.lock().unwrap().insert(raw.id.clone(), raw);
        }
    }

    #[async_trait]
    impl MailboxProvider for FakeMailbox {
        async fn list_messages(
            &self,
            _credentials: &MailboxCredentials,
            _query: &str,
            max_results: u32,
        ) -> Result<Vec<String>, MailboxError> {
            let unread = self.unread.lock().unwrap();
            Ok(self
                .order
                .lock()
                .unwrap()
                .iter()
                .filter(|id| unread.contains(*id))
                .take(max_results as usize)
                .cloned()
                .collect())
        }

        async fn get_message(
            &self,
            _credentials: &MailboxCredentials,
            id: &str,
        ) -> Result<RawMessage, MailboxError> {
            *self.get_calls.lock().unwrap() += 1;
            if self.failing_gets.lock().unwrap().contains(id) {
                return Err(MailboxError::transient("get", "connection reset"));
            }
            self.messages
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or_else(|| MailboxError::NotFound { id: id.to_string() })
        }

        async fn modify_labels(
            &self,
            _credentials: &MailboxCredentials,
            id: &str,
            _add: &[&str],
            remove: &[&str],
        ) -> Result<(), MailboxError> {
            if *self.fail_modify.lock().unwrap() {
                return Err(MailboxError::transient("modify", "503 backend error"));
            }
            if remove.contains(&UNREAD_LABEL) {
                self.unread.lock().unwrap().remove(id);
            }
            Ok(())
        }

        async fn send_message(
            &self,
            _credentials: &MailboxCredentials,
            raw: &str,
            thread_id: Option<&str>,
        ) -> Result<SentMessage, MailboxError> {
            if *self.fail_send.lock().unwrap() {
                return Err(MailboxError::transient("send", "timed out"));
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push((raw.to_string(), thread_id.map(str::to_string)));
            Ok(SentMessage {
                id: format!("sent-{}", sent.len()),
                thread_id: thread_id.unwrap_or_default().to_string(),
            })
        }
    }

    pub(crate) fn message(id: &str, subject: &str, body: &str) -> RawMessage {
        RawMessage {
            id: id.into(),
            thread_id: format!("thread-{id}"),
            snippet: body.chars().take(20).collect(),
            label_ids: vec![UNREAD_LABEL.into()],
            payload: MessagePart {
                headers: vec![
                    Header::new("Subject", subject),
                    Header::new("From", "Alice <alice@example.com>"),
                    Header::new("To", "me@example.com"),
                    Header::new("Message-ID", format!("<{id}@mail.example.com>")),
                ],
                ..MessagePart::leaf("text/plain", URL_SAFE_NO_PAD.encode(body))
            },
        }
    }

    pub(crate) fn creds() -> MailboxCredentials {
        MailboxCredentials::new("access").with_refresh_token("refresh")
    }

    fn gateway(fake: Arc<FakeMailbox>) -> MailboxGateway {
        MailboxGateway::new(fake, MailboxConfig::default())
    }

    #[tokio::test]
    async fn list_unread_empty_is_ok() {
        let gw = gateway(Arc::new(FakeMailbox::default()));
        let ids = gw.list_unread(&creds(), 5).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn list_unread_respects_max_results() {
        let fake = Arc::new(FakeMailbox::default());
        for i in 0..4 {
            fake.insert(message(&format!("m{i}"), "s", "b"));
        }
        let gw = gateway(fake);
        assert_eq!(gw.list_unread(&creds(), 2).await.unwrap(), vec!["m0", "m1"]);
    }

    #[tokio::test]
    async fn batch_keeps_successes_and_records_failures() {
        let fake = Arc::new(FakeMailbox::default());
        fake.insert(message("m1", "one", "first"));
        fake.insert(message("m2", "two", "second"));
        fake.failing_gets.lock().unwrap().insert("m1".into());
        let gw = gateway(fake);

        let ids = vec!["m1".to_string(), "m2".to_string()];
        let batch = gw.get_batch(&creds(), &ids).await;
        assert_eq!(batch.emails.len(), 1);
        assert_eq!(batch.emails[0].id, "m2");
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].id, "m1");
        assert!(batch.is_partial());
    }

    #[tokio::test]
    async fn batch_preserves_listing_order() {
        let fake = Arc::new(FakeMailbox::default());
        for id in ["c", "a", "b"] {
            fake.insert(message(id, id, id));
        }
        let gw = gateway(fake);
        let ids: Vec<String> = ["b", "c", "a"].iter().map(|s| s.to_string()).collect();
        let batch = gw.get_batch(&creds(), &ids).await;
        let got: Vec<&str> = batch.emails.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(got, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn mark_read_is_idempotent() {
        let fake = Arc::new(FakeMailbox::default());
        fake.insert(message("m1", "s", "b"));
        let gw = gateway(Arc::clone(&fake));

        gw.mark_read(&creds(), "m1").await.unwrap();
        let after_first = fake.unread.lock().unwrap().clone();
        gw.mark_read(&creds(), "m1").await.unwrap();
        assert_eq!(*fake.unread.lock().unwrap(), after_first);
        assert!(after_first.is_empty());
    }

    #[tokio::test]
    async fn send_reply_threads_and_marks_read() {
        let fake = Arc::new(FakeMailbox::default());
        fake.insert(message("m1", "Project Update", "status?"));
        let gw = gateway(Arc::clone(&fake));

        let result = gw
            .send_reply(&creds(), "m1", "Thanks, will follow up.")
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.original_marked_read);
        assert_eq!(result.housekeeping, HousekeepingState::Done);
        assert!(result.warning.is_none());
        assert_eq!(result.thread_id, "thread-m1");

        let sent = fake.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.as_deref(), Some("thread-m1"));
        let text = String::from_utf8(URL_SAFE_NO_PAD.decode(&sent[0].0).unwrap()).unwrap();
        assert!(text.contains("Subject: Re: Project Update\n"));
        assert!(text.contains("In-Reply-To: <m1@mail.example.com>\n"));
        assert!(!fake.unread.lock().unwrap().contains("m1"));
    }

    #[tokio::test]
    async fn send_reply_refetches_original() {
        let fake = Arc::new(FakeMailbox::default());
        fake.insert(message("m1", "s", "b"));
        let gw = gateway(Arc::clone(&fake));

        gw.send_reply(&creds(), "m1", "one").await.unwrap();
        gw.send_reply(&creds(), "m1", "two").await.unwrap();
        assert_eq!(*fake.get_calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn housekeeping_failure_still_reports_success() {
        let fake = Arc::new(FakeMailbox::default());
        fake.insert(message("m1", "s", "b"));
        *fake.fail_modify.lock().unwrap() = true;
        let gw = gateway(Arc::clone(&fake));

        let result = gw
            .send_reply(&creds(), "m1", "Thanks, will follow up.")
            .await
            .unwrap();
        assert!(result.success);
        assert!(!result.original_marked_read);
        assert!(matches!(result.housekeeping, HousekeepingState::Failed { .. }));
        assert!(result.warning.is_some());
        assert!(fake.unread.lock().unwrap().contains("m1"));
    }

    #[tokio::test]
    async fn failed_send_never_marks_read() {
        let fake = Arc::new(FakeMailbox::default());
        fake.insert(message("m1", "s", "b"));
        *fake.fail_send.lock().unwrap() = true;
        let gw = gateway(Arc::clone(&fake));

        let err = gw.send_reply(&creds(), "m1", "hi").await.unwrap_err();
        assert!(matches!(err, Error::Mailbox(MailboxError::Transient { .. })));
        assert!(fake.unread.lock().unwrap().contains("m1"));
    }

    #[tokio::test]
    async fn missing_sender_rejected_before_send() {
        let fake = Arc::new(FakeMailbox::default());
        let mut raw = message("m1", "s", "b");
        raw.payload.headers.retain(|h| h.name != "From");
        fake.insert(raw);
        let gw = gateway(Arc::clone(&fake));

        let err = gw.send_reply(&creds(), "m1", "hi").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(fake.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn submitted_reply_is_pending_until_housekeeping() {
        let fake = Arc::new(FakeMailbox::default());
        fake.insert(message("m1", "s", "b"));
        let gw = gateway(Arc::clone(&fake));

        let sent = gw.submit_reply(&creds(), "m1", "hi").await.unwrap();
        assert_eq!(sent.state(), HousekeepingState::Pending);
        assert!(fake.unread.lock().unwrap().contains("m1"));

        let result = gw.complete_housekeeping(&creds(), sent).await;
        assert_eq!(result.housekeeping, HousekeepingState::Done);
    }
}
