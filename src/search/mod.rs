//! Retrieval over the flattened corpus
//!
//! Two paths rank the same records:
//! - semantic: [`EmbeddingIndex`] + [`rank`] (cosine over title embeddings)
//! - lexical: [`LexicalMatcher`] (keyword overlap, always available)

pub mod distance;
pub mod index;
pub mod lexical;
pub mod ranker;

pub use distance::{cosine_similarity, magnitude};
pub use index::EmbeddingIndex;
pub use lexical::{LexicalMatcher, LexicalWeights};
pub use ranker::{rank, DEFAULT_TOP_K};
