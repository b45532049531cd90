//! Similarity Ranker

use std::cmp::Ordering;

use super::distance::magnitude;
use super::index::EmbeddingIndex;
use crate::corpus::{CorpusRecord, ScoredRecord};

/// Results returned when the caller does not ask for a count
pub const DEFAULT_TOP_K: usize = 3;

/// Rank `records` by cosine similarity to `query`.
///
/// Records without a vector score 0 and rank after all indexed records.
/// Ties keep corpus order. An empty index ranks nothing, which tells the
/// caller to use the lexical path instead.
pub fn rank(
    query: &[f32],
    index: &EmbeddingIndex,
    records: &[CorpusRecord],
    top_k: usize,
) -> Vec<ScoredRecord> {
    if top_k == 0 || index.is_empty() {
        return Vec::new();
    }

    let query_magnitude = magnitude(query);
    let mut scored = Vec::with_capacity(records.len());
    let mut unindexed = Vec::new();
    for record in records {
        match index.similarity(&record.id, query, Some(query_magnitude)) {
            Some(score) => scored.push(ScoredRecord {
                score,
                record: record.clone(),
            }),
            None => unindexed.push(ScoredRecord {
                score: 0.0,
                record: record.clone(),
            }),
        }
    }

    // Unindexed records go after every indexed one, even a negative match
    sort_descending(&mut scored);
    scored.extend(unindexed);
    scored.truncate(top_k);
    scored
}

/// Stable sort by non-increasing score
pub(crate) fn sort_descending(scored: &mut [ScoredRecord]) {
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}
