//! Corpus data model
//!
//! The bundled tips document is a nested category -> tip -> article tree.
//! Field names follow the camelCase JSON of the bundled assets. Titles and
//! bodies are optional at the serde level so that a missing field can be
//! reported with its position by the flattener instead of as an opaque parse
//! error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// Nested document
// =============================================================================

/// Root of a bundled tips document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipsDocument {
    pub category: Vec<TipCategory>,
    #[serde(default)]
    pub last_modification_date: Option<i64>,
}

impl TipsDocument {
    /// Parse a document from JSON text
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Last modification time of the whole document, if present
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modification_date
            .and_then(DateTime::from_timestamp_millis)
    }

    /// Total number of articles across all categories
    pub fn article_count(&self) -> usize {
        self.category
            .iter()
            .flat_map(|c| c.tips.iter())
            .map(|t| t.articles.len())
            .sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipCategory {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tips: Vec<Tip>,
    #[serde(default)]
    pub event_codes: Vec<String>,
    #[serde(default)]
    pub last_modification_date: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tip {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub articles: Vec<TipArticle>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body_text: Option<String>,
    #[serde(default)]
    pub image: Option<TipImage>,
    #[serde(default)]
    pub last_modification_date: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipImage {
    pub src: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub last_modification_date: Option<i64>,
    #[serde(default)]
    pub hash: String,
}

// =============================================================================
// Flattened record
// =============================================================================

/// One searchable article, produced by [`flatten`](super::flatten).
///
/// Records are never mutated after creation; a corpus or locale reload
/// replaces the whole set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusRecord {
    /// `tip_<n>`, unique within one flatten call
    pub id: String,
    pub category_title: String,
    pub tip_title: String,
    pub article_title: String,
    /// Raw body, may contain HTML
    pub body_text: String,
    /// Lowercased titles and tag-free body, joined by spaces
    pub searchable_text: String,
    pub event_codes: BTreeSet<String>,
    pub image: Option<TipImage>,
}

impl CorpusRecord {
    /// Title-level text that gets embedded for the index.
    pub fn embedding_text(&self) -> String {
        format!("{}: {}", self.tip_title, self.article_title)
    }
}

/// A record with the score it received from a ranking path.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: CorpusRecord,
    pub score: f32,
}
