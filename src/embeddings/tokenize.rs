// aidcore/src/embeddings/tokenize.rs
//
// Tokenization for BERT-style encoders
//
// Every tokenizer produces content ids only; `pack` adds the sentinels and
// truncates or pads to the fixed length the encoder was exported with.

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokenizers::Tokenizer;

/// Tokenized input ready for model inference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedInput {
    pub ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
}

impl TokenizedInput {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of non-padding positions, sentinels included
    pub fn valid_tokens(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m != 0).count()
    }
}

/// Sentinel ids of a vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub cls: i64,
    pub sep: i64,
    pub pad: i64,
}

impl Default for SpecialTokens {
    /// BERT uncased vocabulary
    fn default() -> Self {
        Self {
            cls: 101,
            sep: 102,
            pad: 0,
        }
    }
}

/// Lay out `[CLS] content [SEP] [PAD]...` at exactly `max_len` positions.
///
/// Content is cut to `max_len - 2`. For `max_len < 2` the sentinels are cut
/// as well, so the output length still equals `max_len`.
pub fn pack(content: &[i64], special: SpecialTokens, max_len: usize) -> TokenizedInput {
    let mut ids = Vec::with_capacity(max_len);
    ids.push(special.cls);
    ids.extend(content.iter().take(max_len.saturating_sub(2)));
    ids.push(special.sep);
    ids.truncate(max_len);

    let valid = ids.len();
    let mut attention_mask = vec![1i64; valid];
    ids.resize(max_len, special.pad);
    attention_mask.resize(max_len, 0);

    TokenizedInput {
        ids,
        attention_mask,
    }
}

/// Tokenizer errors
#[derive(Debug, Clone, Error)]
pub enum TokenizerError {
    #[error("Failed to load tokenizer: {0}")]
    LoadFailed(String),
    #[error("Failed to encode text: {0}")]
    EncodeFailed(String),
}

/// A vocabulary that can turn text into content ids.
pub trait Tokenize: Send + Sync {
    /// Content ids without sentinels
    fn encode_ids(&self, text: &str) -> Result<Vec<i64>, TokenizerError>;

    fn special_tokens(&self) -> SpecialTokens;

    /// Tokenize to exactly `max_len` ids with the matching attention mask
    fn tokenize(&self, text: &str, max_len: usize) -> Result<TokenizedInput, TokenizerError> {
        let content = self.encode_ids(text)?;
        Ok(pack(&content, self.special_tokens(), max_len))
    }
}

// =============================================================================
// HuggingFace tokenizer
// =============================================================================

/// Tokenizer wrapper for `tokenizer.json` vocabularies
pub struct EmbedTokenizer {
    tokenizer: Arc<Tokenizer>,
    special: SpecialTokens,
}

impl EmbedTokenizer {
    /// Create tokenizer from tokenizer.json contents
    pub fn from_json(tokenizer_json: &str) -> Result<Self, TokenizerError> {
        let tokenizer = Tokenizer::from_bytes(tokenizer_json.as_bytes())
            .map_err(|e| TokenizerError::LoadFailed(e.to_string()))?;
        Self::from_tokenizer(tokenizer)
    }

    /// Load tokenizer.json from disk
    pub fn from_file(path: &Path) -> Result<Self, TokenizerError> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| TokenizerError::LoadFailed(format!("{}: {}", path.display(), e)))?;
        Self::from_tokenizer(tokenizer)
    }

    fn from_tokenizer(mut tokenizer: Tokenizer) -> Result<Self, TokenizerError> {
        // Packing is done by `pack`, not by the file's own settings
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(None)
            .map_err(|e| TokenizerError::LoadFailed(e.to_string()))?;

        let defaults = SpecialTokens::default();
        let lookup = |names: &[&str], fallback: i64| {
            names
                .iter()
                .find_map(|name| tokenizer.token_to_id(name))
                .map(i64::from)
                .unwrap_or(fallback)
        };
        let special = SpecialTokens {
            cls: lookup(&["[CLS]", "<s>"], defaults.cls),
            sep: lookup(&["[SEP]", "</s>"], defaults.sep),
            pad: lookup(&["[PAD]", "<pad>"], defaults.pad),
        };

        Ok(Self {
            tokenizer: Arc::new(tokenizer),
            special,
        })
    }
}

impl Tokenize for EmbedTokenizer {
    fn encode_ids(&self, text: &str) -> Result<Vec<i64>, TokenizerError> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| TokenizerError::EncodeFailed(e.to_string()))?;
        Ok(encoding.get_ids().iter().map(|&id| id as i64).collect())
    }

    fn special_tokens(&self) -> SpecialTokens {
        self.special
    }
}

// =============================================================================
// Code-point tokenizer
// =============================================================================

/// Vocabulary-free fallback: each character maps to its code point modulo
/// the BERT vocabulary size. Deterministic, but only loosely aligned with
/// what the encoder was trained on.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharTokenizer;

impl CharTokenizer {
    pub const VOCAB_SIZE: u32 = 30_000;
}

impl Tokenize for CharTokenizer {
    fn encode_ids(&self, text: &str) -> Result<Vec<i64>, TokenizerError> {
        Ok(text
            .chars()
            .map(|c| i64::from(u32::from(c) % Self::VOCAB_SIZE))
            .collect())
    }

    fn special_tokens(&self) -> SpecialTokens {
        SpecialTokens::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORD_LEVEL_JSON: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"[PAD]": 0, "[UNK]": 1, "[CLS]": 2, "[SEP]": 3, "query": 4, ":": 5, "sturm": 6},
            "unk_token": "[UNK]"
        }
    }"#;

    #[test]
    fn test_pack_pads_to_fixed_length() {
        let packed = pack(&[7, 8, 9], SpecialTokens::default(), 8);
        assert_eq!(packed.ids, vec![101, 7, 8, 9, 102, 0, 0, 0]);
        assert_eq!(packed.attention_mask, vec![1, 1, 1, 1, 1, 0, 0, 0]);
        assert_eq!(packed.valid_tokens(), 5);
    }

    #[test]
    fn test_pack_truncates_keeping_sep() {
        let content: Vec<i64> = (1000..1100).collect();
        let packed = pack(&content, SpecialTokens::default(), 6);
        assert_eq!(packed.ids, vec![101, 1000, 1001, 1002, 1003, 102]);
        assert_eq!(packed.valid_tokens(), 6);
    }

    #[test]
    fn test_pack_tiny_lengths() {
        assert!(pack(&[5], SpecialTokens::default(), 0).is_empty());
        assert_eq!(pack(&[5], SpecialTokens::default(), 1).ids, vec![101]);
        assert_eq!(pack(&[5], SpecialTokens::default(), 2).ids, vec![101, 102]);
    }

    #[test]
    fn test_length_invariant_for_any_input() {
        let tokenizer = CharTokenizer;
        let long = "x".repeat(2000);
        for text in ["", "a", "query: Sturm", long.as_str()] {
            for max_len in [0usize, 1, 2, 3, 16, 512] {
                let out = tokenizer.tokenize(text, max_len).unwrap();
                assert_eq!(out.ids.len(), max_len);
                assert_eq!(out.attention_mask.len(), max_len);
                assert!(out.valid_tokens() <= max_len);
                let mask_sum: i64 = out.attention_mask.iter().sum();
                assert_eq!(mask_sum as usize, out.valid_tokens());
            }
        }
    }

    #[test]
    fn test_char_tokenizer_is_deterministic() {
        let tokenizer = CharTokenizer;
        let a = tokenizer.tokenize("Hochwasser", 32).unwrap();
        let b = tokenizer.tokenize("Hochwasser", 32).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.ids[1], i64::from(u32::from('H')));
        // Code points past the vocabulary wrap around
        let emoji = tokenizer.encode_ids("🔥").unwrap();
        assert_eq!(emoji, vec![i64::from(0x1F525u32 % 30_000)]);
    }

    #[test]
    fn test_embed_tokenizer_resolves_sentinels() {
        let tokenizer = EmbedTokenizer::from_json(WORD_LEVEL_JSON).unwrap();
        assert_eq!(
            tokenizer.special_tokens(),
            SpecialTokens {
                cls: 2,
                sep: 3,
                pad: 0
            }
        );

        let out = tokenizer.tokenize("query: sturm", 7).unwrap();
        assert_eq!(out.ids, vec![2, 4, 5, 6, 3, 0, 0]);
        assert_eq!(out.attention_mask, vec![1, 1, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn test_embed_tokenizer_rejects_garbage() {
        assert!(matches!(
            EmbedTokenizer::from_json("not a tokenizer"),
            Err(TokenizerError::LoadFailed(_))
        ));
    }
}
