//! Error taxonomy for the retrieval core.
//!
//! Only [`RetrievalError::CorpusMalformed`] ever reaches a caller of the
//! assistant. The other kinds are caught by the component that produced them
//! and turned into a lexical fallback.

use thiserror::Error;

/// Errors produced by the retrieval subsystem.
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    /// The model file could not be located or materialized locally
    #[error("model artifact unresolvable: {0}")]
    ArtifactUnresolvable(String),

    /// Both the path-based and the buffer-based session construction failed
    #[error("session construction failed (path: {path_error}; buffer: {buffer_error})")]
    SessionConstructionFailed {
        path_error: String,
        buffer_error: String,
    },

    /// A single embed call failed on an otherwise healthy session
    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    /// The corpus document is missing required fields
    #[error("corpus malformed: {0}")]
    CorpusMalformed(String),
}

/// Copyable discriminant of [`RetrievalError`], kept in session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ArtifactUnresolvable,
    SessionConstructionFailed,
    EmbeddingFailed,
    CorpusMalformed,
}

impl RetrievalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ArtifactUnresolvable(_) => ErrorKind::ArtifactUnresolvable,
            Self::SessionConstructionFailed { .. } => ErrorKind::SessionConstructionFailed,
            Self::EmbeddingFailed(_) => ErrorKind::EmbeddingFailed,
            Self::CorpusMalformed(_) => ErrorKind::CorpusMalformed,
        }
    }

    /// True for the only kind that must be surfaced as a hard failure.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CorpusMalformed(_))
    }
}
