//! Embedding Index
//!
//! `record id -> vector` for the currently loaded corpus. An index is built
//! in one pass and never patched: a corpus or locale change builds a new one
//! and the caller swaps it in whole.

use std::collections::HashMap;
use tracing::{info, instrument, warn};

use super::distance::{cosine_similarity, magnitude};
use crate::corpus::CorpusRecord;
use crate::embeddings::{TextEmbedder, TextRole};

#[derive(Debug, Clone)]
struct IndexedVector {
    vector: Vec<f32>,
    magnitude: f32,
}

#[derive(Debug, Clone, Default)]
pub struct EmbeddingIndex {
    dimensions: Option<usize>,
    vectors: HashMap<String, IndexedVector>,
}

impl EmbeddingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Embed every record's titles and index the vectors that came back.
    ///
    /// Records the embedder returns `None` for are left out.
    #[instrument(skip_all, fields(records = records.len()))]
    pub async fn build(records: &[CorpusRecord], embedder: &dyn TextEmbedder) -> Self {
        let started = instant::Instant::now();
        let mut index = Self::new();
        let mut skipped = 0usize;

        for record in records {
            let Some(vector) = embedder.embed(&record.embedding_text(), TextRole::Passage).await
            else {
                skipped += 1;
                continue;
            };
            if let Err(e) = index.insert(&record.id, vector) {
                warn!(id = %record.id, error = %e, "Dropping vector");
                skipped += 1;
            }
        }

        info!(
            indexed = index.len(),
            skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Embedding index built"
        );
        index
    }

    /// Insert a vector. The first vector fixes the dimension.
    pub fn insert(&mut self, id: &str, vector: Vec<f32>) -> Result<(), String> {
        let expected = *self.dimensions.get_or_insert(vector.len());
        if vector.len() != expected {
            return Err(format!(
                "Vector dimension mismatch: expected {}, got {}",
                expected,
                vector.len()
            ));
        }

        let magnitude = magnitude(&vector);
        self.vectors
            .insert(id.to_string(), IndexedVector { vector, magnitude });
        Ok(())
    }

    /// Cosine similarity between `query` and the vector stored under `id`
    pub fn similarity(&self, id: &str, query: &[f32], query_magnitude: Option<f32>) -> Option<f32> {
        self.vectors.get(id).map(|entry| {
            cosine_similarity(query, &entry.vector, query_magnitude, Some(entry.magnitude))
        })
    }

    pub fn get(&self, id: &str) -> Option<&[f32]> {
        self.vectors.get(id).map(|entry| entry.vector.as_slice())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.vectors.contains_key(id)
    }

    /// Vector width, once anything has been inserted
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// Number of vectors in the index
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}
