// aidcore/src/embeddings/config.rs
//
// Configuration types for the encoder session

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Supported ONNX sentence encoders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OnnxModel {
    /// intfloat/e5-small-v2 - 384 dimensions, trained with "query: " / "passage: " markers
    #[default]
    #[serde(rename = "e5-small-v2")]
    E5SmallV2,

    /// intfloat/multilingual-e5-small - 384 dimensions, covers German and English
    #[serde(rename = "multilingual-e5-small")]
    MultilingualE5Small,

    /// all-MiniLM-L6-v2 - 384 dimensions, no input markers
    #[serde(rename = "all-minilm-l6-v2")]
    AllMiniLML6V2,
}

impl fmt::Display for OnnxModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::E5SmallV2 => write!(f, "e5-small-v2"),
            Self::MultilingualE5Small => write!(f, "multilingual-e5-small"),
            Self::AllMiniLML6V2 => write!(f, "all-minilm-l6-v2"),
        }
    }
}

impl FromStr for OnnxModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "e5-small" | "e5-small-v2" => Ok(Self::E5SmallV2),
            "multilingual-e5-small" | "me5-small" => Ok(Self::MultilingualE5Small),
            "all-minilm-l6-v2" | "minilm" => Ok(Self::AllMiniLML6V2),
            other => Err(format!("Unknown model: {}", other)),
        }
    }
}

impl OnnxModel {
    /// Get the expected embedding dimensions for this model
    pub fn dimensions(&self) -> usize {
        384
    }

    /// Get the maximum sequence length for this model
    pub fn max_length(&self) -> usize {
        match self {
            Self::E5SmallV2 | Self::MultilingualE5Small => 512,
            Self::AllMiniLML6V2 => 256,
        }
    }

    /// E5 models expect a role marker in front of every input
    pub fn uses_role_markers(&self) -> bool {
        matches!(self, Self::E5SmallV2 | Self::MultilingualE5Small)
    }

    /// Marker the model was trained with. The shipped corpus was indexed with
    /// the query marker, so E5 uses it for both roles.
    pub fn default_prefix(&self) -> &'static str {
        if self.uses_role_markers() {
            "query: "
        } else {
            ""
        }
    }
}

/// Encoder session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Which model the artifact contains
    pub model: OnnxModel,

    /// Local path, `file://` URI or `http(s)://` URL of the ONNX file
    pub model_location: String,

    /// `tokenizer.json` for the model. Without it the code-point tokenizer is used.
    pub tokenizer_path: Option<PathBuf>,

    /// Where a remote artifact is materialized
    pub cache_dir: PathBuf,

    /// Token sequence length fed to the model
    pub max_length: usize,

    /// Marker prepended to queries; the model's own marker when unset
    pub query_prefix: Option<String>,

    /// Marker prepended to indexed corpus text; the model's own marker when unset
    pub passage_prefix: Option<String>,

    /// Whether to L2-normalize pooled vectors
    pub normalize: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            model: OnnxModel::default(),
            model_location: "assets/models/model.onnx".to_string(),
            tokenizer_path: None,
            cache_dir: PathBuf::from(".cache/aidcore"),
            max_length: 512,
            query_prefix: None,
            passage_prefix: None,
            normalize: false,
        }
    }
}

impl EncoderConfig {
    /// Builder: set model
    pub fn with_model(mut self, model: OnnxModel) -> Self {
        self.model = model;
        self
    }

    /// Builder: set artifact location
    pub fn with_model_location(mut self, location: impl Into<String>) -> Self {
        self.model_location = location.into();
        self
    }

    /// Builder: set tokenizer file
    pub fn with_tokenizer_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tokenizer_path = Some(path.into());
        self
    }

    /// Builder: set download cache directory
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Builder: set sequence length
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Builder: set both role markers
    pub fn with_prefixes(mut self, query: impl Into<String>, passage: impl Into<String>) -> Self {
        self.query_prefix = Some(query.into());
        self.passage_prefix = Some(passage.into());
        self
    }

    pub fn query_prefix(&self) -> &str {
        self.query_prefix
            .as_deref()
            .unwrap_or_else(|| self.model.default_prefix())
    }

    pub fn passage_prefix(&self) -> &str {
        self.passage_prefix
            .as_deref()
            .unwrap_or_else(|| self.model.default_prefix())
    }

    /// Sequence length actually used, capped by the model's limit
    pub fn effective_max_length(&self) -> usize {
        self.max_length.min(self.model.max_length())
    }
}
