//! Draft generator: uses the LLM to write one reply body in a chosen tone.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::DraftConfig;
use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};

use super::model::Tone;

/// Generates reply drafts from message bodies.
///
/// Every call is independent: a regeneration is a fresh call, never a diff
/// against an earlier draft.
pub struct DraftGenerator {
    llm: Arc<dyn LlmProvider>,
    config: DraftConfig,
}

impl DraftGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, config: DraftConfig) -> Self {
        Self { llm, config }
    }

    /// Write a reply to `source_text` in `tone`.
    pub async fn generate(&self, source_text: &str, tone: Tone) -> Result<String, LlmError> {
        info!(tone = %tone, model = self.llm.model_name(), "Generating reply draft");

        let request = CompletionRequest::new(vec![
            ChatMessage::system(system_prompt(tone)),
            ChatMessage::user(format!("Email to reply to:\n\n{source_text}")),
        ])
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens);

        let response = tokio::time::timeout(self.config.llm_timeout, self.llm.complete(request))
            .await
            .map_err(|_| LlmError::Timeout {
                provider: self.llm.model_name().to_string(),
                timeout: self.config.llm_timeout,
            })??;

        let draft = clean_draft(&response.content);
        if draft.is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: self.llm.model_name().to_string(),
            });
        }

        debug!(
            chars = draft.chars().count(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Draft generated"
        );
        Ok(draft)
    }
}

fn system_prompt(tone: Tone) -> String {
    format!(
        "You write email replies on behalf of the user.\n\n\
         Rules:\n\
         - Write a single reply body in a {tone} tone: {guidance}\n\
         - Do not quote or repeat the original email\n\
         - No subject line, no headers, no placeholders like [Name]\n\
         - Do not explain what you are doing\n\n\
         Output ONLY the reply text.",
        tone = tone,
        guidance = tone.guidance(),
    )
}

/// Trim model output and drop a wrapping code fence or a leading subject line.
fn clean_draft(text: &str) -> String {
    let mut draft = text.trim();

    if let Some(inner) = draft.strip_prefix("```") {
        let inner = inner.split_once('\n').map_or("", |(_, rest)| rest);
        draft = inner.strip_suffix("```").unwrap_or(inner).trim();
    }

    if draft.starts_with("Subject:") {
        draft = draft.split_once('\n').map_or("", |(_, rest)| rest).trim();
    }

    draft.to_string()
}
