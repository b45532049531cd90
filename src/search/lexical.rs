//! Lexical Matcher
//!
//! Keyword overlap scoring over the flattened records. Needs no model, so it
//! answers whenever the encoder cannot.

use serde::{Deserialize, Serialize};

use super::ranker::sort_descending;
use crate::corpus::{CorpusRecord, ScoredRecord};

/// Points a query term earns per field it occurs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalWeights {
    /// Anywhere in the searchable text
    pub body: u32,
    pub category_title: u32,
    pub tip_title: u32,
    pub article_title: u32,
}

impl Default for LexicalWeights {
    fn default() -> Self {
        Self {
            body: 1,
            category_title: 2,
            tip_title: 2,
            article_title: 1,
        }
    }
}

/// Terms shorter than this many characters are ignored
const MIN_TERM_CHARS: usize = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalMatcher {
    weights: LexicalWeights,
}

impl LexicalMatcher {
    pub fn new(weights: LexicalWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &LexicalWeights {
        &self.weights
    }

    /// Lowercased whitespace-delimited terms of at least three characters
    pub fn terms(query: &str) -> Vec<String> {
        query
            .split_whitespace()
            .filter(|term| term.chars().count() >= MIN_TERM_CHARS)
            .map(str::to_lowercase)
            .collect()
    }

    /// Score one record against pre-split terms
    pub fn score(&self, terms: &[String], record: &CorpusRecord) -> u32 {
        let category = record.category_title.to_lowercase();
        let tip = record.tip_title.to_lowercase();
        let article = record.article_title.to_lowercase();

        terms
            .iter()
            .map(|term| {
                let mut points = 0;
                if record.searchable_text.contains(term.as_str()) {
                    points += self.weights.body;
                }
                if category.contains(term.as_str()) {
                    points += self.weights.category_title;
                }
                if tip.contains(term.as_str()) {
                    points += self.weights.tip_title;
                }
                if article.contains(term.as_str()) {
                    points += self.weights.article_title;
                }
                points
            })
            .sum()
    }

    /// All records with a positive score, best first, ties in corpus order
    pub fn score_records(&self, query: &str, records: &[CorpusRecord]) -> Vec<ScoredRecord> {
        let terms = Self::terms(query);
        if terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<ScoredRecord> = records
            .iter()
            .filter_map(|record| {
                let score = self.score(&terms, record);
                (score > 0).then(|| ScoredRecord {
                    record: record.clone(),
                    score: score as f32,
                })
            })
            .collect();

        sort_descending(&mut scored);
        scored
    }

    pub fn search(&self, query: &str, records: &[CorpusRecord], top_k: usize) -> Vec<CorpusRecord> {
        let mut scored = self.score_records(query, records);
        scored.truncate(top_k);
        scored.into_iter().map(|s| s.record).collect()
    }
}
