//! Draftly: unread-mail triage with AI-drafted, threaded replies.

pub mod api;
pub mod config;
pub mod drafts;
pub mod error;
pub mod llm;
pub mod mail;
