//! Draft orchestrator: the upward-facing operations of the reply pipeline.
//!
//! Holds no listing state. Tracks only which draft request is the latest per
//! (session, email) and which sends are in flight.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Error, Result, ValidationError};
use crate::mail::{EmailBatch, MailboxGateway, SendResult, SessionContext};

use super::generator::DraftGenerator;
use super::model::{DraftOutcome, ReplyDraft, Tone};
use super::tracking::{DraftSequencer, InFlightSends};

/// Coordinates listing, drafting, and sending for authenticated sessions.
pub struct DraftOrchestrator {
    gateway: Arc<MailboxGateway>,
    generator: DraftGenerator,
    sequencer: DraftSequencer,
    sends: InFlightSends,
}

impl DraftOrchestrator {
    pub fn new(gateway: Arc<MailboxGateway>, generator: DraftGenerator) -> Self {
        Self {
            gateway,
            generator,
            sequencer: DraftSequencer::new(),
            sends: InFlightSends::new(),
        }
    }

    /// Unread messages, normalized, in provider listing order.
    pub async fn list_unread(
        &self,
        session: &SessionContext,
        max_results: Option<u32>,
    ) -> Result<EmailBatch> {
        let max = max_results.unwrap_or_else(|| self.gateway.default_max_results());
        let ids = self.gateway.list_unread(&session.credentials, max).await?;
        self.get_email_batch(session, &ids).await
    }

    /// Fetch the given messages concurrently.
    ///
    /// Partial failure is reported inside the batch; only a batch where every
    /// item failed is an error.
    pub async fn get_email_batch(
        &self,
        session: &SessionContext,
        ids: &[String],
    ) -> Result<EmailBatch> {
        if ids.is_empty() {
            return Ok(EmailBatch::default());
        }

        let batch = self.gateway.get_batch(&session.credentials, ids).await;
        if batch.emails.is_empty() {
            warn!(
                user = %session.user_id,
                failed = batch.failures.len(),
                "Every message in the batch failed to fetch"
            );
            return Err(Error::BatchFailed {
                failures: batch.failures,
            });
        }
        if batch.is_partial() {
            warn!(
                user = %session.user_id,
                fetched = batch.emails.len(),
                failed = batch.failures.len(),
                "Partial batch fetch"
            );
        }
        Ok(batch)
    }

    /// Generate a draft reply for `email_id` in `tone`.
    ///
    /// The tone is validated before anything touches the network. If another
    /// request for the same email was issued while this one was in flight,
    /// the result comes back as [`DraftOutcome::Stale`].
    pub async fn generate_draft(
        &self,
        session: &SessionContext,
        email_id: &str,
        tone: &str,
    ) -> Result<DraftOutcome> {
        if email_id.trim().is_empty() {
            return Err(ValidationError::EmptyEmailId.into());
        }
        let tone: Tone = tone.parse()?;

        let ticket = self.sequencer.begin(session.tracking_key(), email_id);
        let seq = ticket.seq();
        debug!(email_id = %email_id, tone = %tone, seq = seq, "Draft requested");

        let email = self
            .gateway
            .get_normalized(&session.credentials, email_id)
            .await?;
        let text = self.generator.generate(&email.body, tone).await?;

        if !ticket.is_current() {
            let latest = ticket.latest();
            info!(
                email_id = %email_id,
                seq = seq,
                latest = latest,
                "Discarding stale draft"
            );
            return Ok(DraftOutcome::Stale {
                email_id: email_id.to_string(),
                request_seq: seq,
                latest_seq: latest,
            });
        }

        Ok(DraftOutcome::Current {
            draft: ReplyDraft::new(email_id, tone, text, seq),
        })
    }

    /// A regeneration is simply a fresh, independent draft request.
    pub async fn regenerate_draft(
        &self,
        session: &SessionContext,
        email_id: &str,
        tone: &str,
    ) -> Result<DraftOutcome> {
        self.generate_draft(session, email_id, tone).await
    }

    /// Send the final reply text and mark the original read.
    ///
    /// Only one send per (session, email) may be in flight; a concurrent
    /// second request is rejected with [`Error::SendInProgress`].
    pub async fn send_and_close(
        &self,
        session: &SessionContext,
        email_id: &str,
        final_text: &str,
    ) -> Result<SendResult> {
        if email_id.trim().is_empty() {
            return Err(ValidationError::EmptyEmailId.into());
        }
        if final_text.trim().is_empty() {
            return Err(ValidationError::EmptyReply.into());
        }

        let _permit = self
            .sends
            .try_acquire(session.tracking_key(), email_id)
            .ok_or_else(|| Error::SendInProgress {
                email_id: email_id.to_string(),
            })?;

        let result = self
            .gateway
            .send_reply(&session.credentials, email_id, final_text)
            .await?;

        if let Some(warning) = &result.warning {
            warn!(email_id = %email_id, warning = %warning.message, "Sent with housekeeping warning");
        }
        Ok(result)
    }

    /// Mark a message read without replying.
    pub async fn mark_read(&self, session: &SessionContext, email_id: &str) -> Result<()> {
        if email_id.trim().is_empty() {
            return Err(ValidationError::EmptyEmailId.into());
        }
        self.gateway
            .mark_read(&session.credentials, email_id)
            .await
            .map_err(Error::from)
    }
}
