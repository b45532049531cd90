//! Emergency assistant front door
//!
//! [`Assistant`] owns the corpus, the encoder session and the index, and
//! turns a free-text question into ranked tips or a structured reply.

pub mod emergency;
pub mod orchestrator;
pub mod reply;

pub use emergency::{detect_emergency_kind, EmergencyDetector, EmergencyKind};
pub use orchestrator::{Assistant, AssistantBuilder, SearchMode};
pub use reply::{AssistantReply, TipSummary, MAX_REPLY_TIPS};

#[cfg(test)]
mod tests;
