// aidcore/src/embeddings/mod.rs
//
// Rust-native sentence encoder for the retrieval core.
// Uses `tract-onnx` for pure-Rust ONNX inference.
//
// Supported models:
// - E5SmallV2 (intfloat/e5-small-v2) - 384 dimensions
// - MultilingualE5Small (intfloat/multilingual-e5-small) - 384 dimensions
// - AllMiniLML6V2 (sentence-transformers/all-MiniLM-L6-v2) - 384 dimensions

pub mod artifact;
pub mod config;
pub mod model;
pub mod progress;
pub mod session;
pub mod tokenize;

// Re-exports
pub use artifact::{ArtifactFetcher, ArtifactResolver, FetchError, HttpFetcher, ModelLocation};
pub use self::config::{EncoderConfig, OnnxModel};
pub use model::{
    mean_pool, InferenceBackend, InferenceRuntime, ModelError, TokenEmbeddings, TractRuntime,
};
pub use progress::{LoadProgress, ProgressReporter};
pub use session::{EncoderSession, SessionMode, SessionState, TextEmbedder, TextRole};
pub use tokenize::{
    pack, CharTokenizer, EmbedTokenizer, SpecialTokens, Tokenize, TokenizedInput, TokenizerError,
};
