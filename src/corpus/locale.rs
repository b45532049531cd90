//! Corpus locale selection

use serde::{Deserialize, Serialize};
use std::fmt;

/// Locales with a bundled tips corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    /// German is the corpus of record and the default for any other locale
    #[default]
    De,
}

impl Locale {
    /// Map a UI language tag (`en`, `en-US`, `de-AT`, `fr`, ...) to a corpus.
    pub fn from_tag(tag: &str) -> Self {
        if tag.trim().to_ascii_lowercase().starts_with("en") {
            Self::En
        } else {
            Self::De
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::De => "de",
        }
    }

    /// File name of the bundled corpus for this locale
    pub fn corpus_file_name(&self) -> String {
        format!("tips-{}.json", self.code())
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
