//! Per-locale corpus sources
//!
//! A [`CorpusSource`] yields the nested tips document for a locale; the
//! flattening into records happens in [`load_records`] so every source shares
//! the same validation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info, instrument};

use super::flatten::flatten;
use super::locale::Locale;
use super::types::{CorpusRecord, TipsDocument};
use crate::error::RetrievalError;

/// Supplies the bundled tips document for a locale.
#[async_trait]
pub trait CorpusSource: Send + Sync {
    async fn load_document(&self, locale: Locale) -> Result<TipsDocument, RetrievalError>;
}

/// Reads `tips-<locale>.json` from a directory of bundled assets.
#[derive(Debug, Clone)]
pub struct DirectoryCorpus {
    dir: PathBuf,
}

impl DirectoryCorpus {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, locale: Locale) -> PathBuf {
        self.dir.join(locale.corpus_file_name())
    }
}

#[async_trait]
impl CorpusSource for DirectoryCorpus {
    async fn load_document(&self, locale: Locale) -> Result<TipsDocument, RetrievalError> {
        let path = self.path_for(locale);
        debug!(path = %path.display(), "Reading corpus");

        let json = tokio::fs::read_to_string(&path).await.map_err(|e| {
            RetrievalError::CorpusMalformed(format!("cannot read {}: {}", path.display(), e))
        })?;

        TipsDocument::from_json(&json).map_err(|e| {
            RetrievalError::CorpusMalformed(format!("{}: {}", path.display(), e))
        })
    }
}

/// Corpus documents held in memory, keyed by locale.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCorpus {
    documents: HashMap<Locale, TipsDocument>,
}

impl InMemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: register a document for a locale
    pub fn with_document(mut self, locale: Locale, doc: TipsDocument) -> Self {
        self.documents.insert(locale, doc);
        self
    }

    /// Builder: register a JSON document for a locale
    pub fn with_json(self, locale: Locale, json: &str) -> Result<Self, RetrievalError> {
        let doc = TipsDocument::from_json(json)
            .map_err(|e| RetrievalError::CorpusMalformed(e.to_string()))?;
        Ok(self.with_document(locale, doc))
    }
}

#[async_trait]
impl CorpusSource for InMemoryCorpus {
    async fn load_document(&self, locale: Locale) -> Result<TipsDocument, RetrievalError> {
        self.documents.get(&locale).cloned().ok_or_else(|| {
            RetrievalError::CorpusMalformed(format!("no corpus bundled for locale '{locale}'"))
        })
    }
}

/// Load and flatten the corpus for `locale`.
#[instrument(skip_all, fields(locale = %locale))]
pub async fn load_records(
    source: &dyn CorpusSource,
    locale: Locale,
) -> Result<Vec<CorpusRecord>, RetrievalError> {
    let doc = source.load_document(locale).await?;
    let records = flatten(&doc)?;
    info!(records = records.len(), "Loaded emergency tips");
    Ok(records)
}
