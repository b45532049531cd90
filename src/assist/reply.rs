//! Structured assistant replies
//!
//! Replies carry data only; wording and translation belong to the UI.

use serde::{Deserialize, Serialize};

use super::emergency::EmergencyKind;
use crate::corpus::{clean_html_text, CorpusRecord, TipImage};

/// Tips included in a reply
pub const MAX_REPLY_TIPS: usize = 3;

/// One tip as shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipSummary {
    pub id: String,
    pub category_title: String,
    pub tip_title: String,
    pub article_title: String,
    /// Body as plain text
    pub text: String,
    pub image: Option<TipImage>,
}

impl TipSummary {
    pub fn from_record(record: &CorpusRecord, max_chars: Option<usize>) -> Self {
        Self {
            id: record.id.clone(),
            category_title: record.category_title.clone(),
            tip_title: record.tip_title.clone(),
            article_title: record.article_title.clone(),
            text: clean_html_text(&record.body_text, max_chars),
            image: record.image.clone(),
        }
    }
}

/// What the assistant answers. Never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AssistantReply {
    /// Matching tips, most relevant first
    Guidance {
        kind: Option<EmergencyKind>,
        tips: Vec<TipSummary>,
    },
    /// Nothing matched; the UI asks to rephrase or points to emergency numbers
    NoMatches { kind: Option<EmergencyKind> },
}

impl AssistantReply {
    pub fn compose(
        kind: Option<EmergencyKind>,
        records: &[CorpusRecord],
        max_chars: Option<usize>,
    ) -> Self {
        if records.is_empty() {
            return Self::NoMatches { kind };
        }

        Self::Guidance {
            kind,
            tips: records
                .iter()
                .take(MAX_REPLY_TIPS)
                .map(|record| TipSummary::from_record(record, max_chars))
                .collect(),
        }
    }

    pub fn kind(&self) -> Option<EmergencyKind> {
        match self {
            Self::Guidance { kind, .. } | Self::NoMatches { kind } => *kind,
        }
    }

    pub fn tips(&self) -> &[TipSummary] {
        match self {
            Self::Guidance { tips, .. } => tips,
            Self::NoMatches { .. } => &[],
        }
    }
}
