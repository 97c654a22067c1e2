//! Draft data model: tones, drafts, and stale-response outcomes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ValidationError;

/// Style of an AI-generated reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Casual,
    Concise,
}

impl Tone {
    pub const ALL: [Tone; 4] = [Self::Professional, Self::Friendly, Self::Casual, Self::Concise];

    /// Phrasing guidance handed to the model.
    pub fn guidance(&self) -> &'static str {
        match self {
            Self::Professional => "polished and courteous, suitable for work correspondence",
            Self::Friendly => "warm and personable while staying clear",
            Self::Casual => "relaxed and conversational, like writing to a colleague you know well",
            Self::Concise => "as short as possible, a few sentences at most",
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Professional => write!(f, "professional"),
            Self::Friendly => write!(f, "friendly"),
            Self::Casual => write!(f, "casual"),
            Self::Concise => write!(f, "concise"),
        }
    }
}

impl std::str::FromStr for Tone {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "professional" => Ok(Self::Professional),
            "friendly" => Ok(Self::Friendly),
            "casual" => Ok(Self::Casual),
            "concise" => Ok(Self::Concise),
            _ => Err(ValidationError::UnknownTone {
                tone: s.to_string(),
            }),
        }
    }
}

/// An AI-generated candidate reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyDraft {
    pub id: Uuid,
    pub email_id: String,
    pub tone: Tone,
    pub text: String,
    /// Per-(session, email) request sequence this draft answers.
    pub request_seq: u64,
    pub created_at: DateTime<Utc>,
}

impl ReplyDraft {
    pub fn new(email_id: impl Into<String>, tone: Tone, text: impl Into<String>, request_seq: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            email_id: email_id.into(),
            tone,
            text: text.into(),
            request_seq,
            created_at: Utc::now(),
        }
    }
}

/// Result of a draft request: either the latest requested draft, or a
/// response overtaken by a newer request for the same email.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DraftOutcome {
    Current {
        draft: ReplyDraft,
    },
    #[serde(rename_all = "camelCase")]
    Stale {
        email_id: String,
        request_seq: u64,
        latest_seq: u64,
    },
}

impl DraftOutcome {
    pub fn into_draft(self) -> Option<ReplyDraft> {
        match self {
            Self::Current { draft } => Some(draft),
            Self::Stale { .. } => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }
}
