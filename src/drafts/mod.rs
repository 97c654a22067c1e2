//! AI drafting: tones, the draft generator, request tracking, and the orchestrator.

pub mod generator;
pub mod model;
pub mod orchestrator;
pub mod tracking;

pub use generator::DraftGenerator;
pub use model::{DraftOutcome, ReplyDraft, Tone};
pub use orchestrator::DraftOrchestrator;
