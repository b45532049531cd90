//! AidCore: on-device retrieval for an emergency assistant
//!
//! Answers free-text questions ("what do I do in a storm?") with the most
//! relevant official safety tips, entirely offline.
//!
//! # Architecture
//!
//! ## Corpus
//! - `corpus/flatten.rs` - category → tip → article tree into flat records
//! - `corpus/loader.rs` - per-locale corpus sources (bundled directory, in-memory)
//!
//! ## Encoder
//! - `embeddings/tokenize.rs` - fixed-length `[CLS] … [SEP] [PAD]*` inputs
//! - `embeddings/model.rs` - inference runtime seam, mean pooling
//! - `embeddings/artifact.rs` - bundled or downloaded-once model artifacts
//! - `embeddings/session.rs` - encoder lifecycle with text-mode fallback
//!
//! ## Search
//! - `search/index.rs` - record id → title embedding
//! - `search/ranker.rs` - cosine top-k
//! - `search/lexical.rs` - keyword overlap, always available
//!
//! ## Assistant
//! - `assist/orchestrator.rs` - load, query, reload, dispose
//! - `assist/emergency.rs` - emergency kind detection
//! - `assist/reply.rs` - structured answers for the chat surface
//!
//! # Usage
//! ```rust,ignore
//! use aidcore::{AssistConfig, Assistant};
//!
//! let assistant = Assistant::new(AssistConfig::load(None)?);
//! assistant.load().await?;
//!
//! for tip in assistant.search("Sturm was tun", None).await {
//!     println!("{}: {}", tip.tip_title, tip.article_title);
//! }
//! ```

pub mod assist;
pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod error;
pub mod search;
pub mod telemetry;

#[cfg(test)]
mod test_utils;

// Public exports
pub use assist::{Assistant, AssistantBuilder, AssistantReply, EmergencyKind, SearchMode, TipSummary};
pub use crate::config::{AssistConfig, RetrievalConfig};
pub use corpus::{CorpusRecord, CorpusSource, Locale, TipsDocument};
pub use embeddings::{EncoderConfig, LoadProgress, OnnxModel, SessionMode, SessionState};
pub use error::{ErrorKind, RetrievalError};

/// Get version information
pub fn version() -> String {
    format!("aidcore v{}", env!("CARGO_PKG_VERSION"))
}
