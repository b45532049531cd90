//! Emergency tips corpus
//!
//! Loading the bundled per-locale document and flattening it into
//! [`CorpusRecord`]s, the unit every retrieval path ranks.
//!
//! # Architecture
//! ```text
//! tips-<locale>.json → CorpusSource → TipsDocument → flatten() → Vec<CorpusRecord>
//! ```

mod flatten;
mod loader;
mod locale;
mod types;

pub use flatten::{clean_html_text, flatten, strip_tags};
pub use loader::{load_records, CorpusSource, DirectoryCorpus, InMemoryCorpus};
pub use locale::Locale;
pub use types::{
    CorpusRecord, ScoredRecord, Tip, TipArticle, TipCategory, TipImage, TipsDocument,
};
