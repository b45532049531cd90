//! Layered configuration
//!
//! Defaults, then an optional file (TOML/JSON/YAML by extension), then
//! `AIDCORE_*` environment variables with `__` between nesting levels:
//!
//! ```text
//! AIDCORE_LOCALE=en
//! AIDCORE_RETRIEVAL__TOP_K=5
//! AIDCORE_ENCODER__MODEL_LOCATION=https://example.org/e5-small.onnx
//! ```

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use ::config::ConfigError;

use crate::corpus::Locale;
use crate::embeddings::EncoderConfig;
use crate::search::{LexicalWeights, DEFAULT_TOP_K};

/// Query-time settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Results when the caller does not ask for a count
    pub top_k: usize,
    /// Bound on one embed + rank cycle before the lexical path takes over
    pub query_timeout_ms: u64,
    /// Cut reply snippets to this many characters
    pub snippet_chars: Option<usize>,
    pub lexical: LexicalWeights,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            query_timeout_ms: 3000,
            snippet_chars: None,
            lexical: LexicalWeights::default(),
        }
    }
}

impl RetrievalConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// Everything the assistant needs to start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    pub locale: Locale,
    /// Directory holding `tips-<locale>.json`
    pub corpus_dir: PathBuf,
    pub encoder: EncoderConfig,
    pub retrieval: RetrievalConfig,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            corpus_dir: PathBuf::from("assets/tips"),
            encoder: EncoderConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl AssistConfig {
    /// Load configuration; a given `path` must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder
            .add_source(
                Environment::with_prefix("AIDCORE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Builder: set locale from a UI language tag
    pub fn with_locale_tag(mut self, tag: &str) -> Self {
        self.locale = Locale::from_tag(tag);
        self
    }

    /// Builder: set corpus directory
    pub fn with_corpus_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.corpus_dir = dir.into();
        self
    }

    /// Builder: set encoder configuration
    pub fn with_encoder(mut self, encoder: EncoderConfig) -> Self {
        self.encoder = encoder;
        self
    }
}
