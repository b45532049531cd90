//! Shared fixtures for unit and scenario tests

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::corpus::{strip_tags, CorpusRecord};
use crate::embeddings::{
    ArtifactFetcher, FetchError, InferenceBackend, InferenceRuntime, ModelError, TextEmbedder,
    TextRole, TokenEmbeddings, TokenizedInput,
};

/// German sample corpus: weather, earthquake, flood and fire guidance
pub const SAMPLE_TIPS_DE: &str = r#"{
  "category": [
    {
      "title": "Naturgefahren",
      "eventCodes": ["BBK-EVC-040"],
      "tips": [
        {"title": "Erdbeben", "articles": [
          {"title": "Während des Bebens", "bodyText": "<p>Unter einem stabilen Tisch Schutz suchen.</p>"}
        ]},
        {"title": "Sturm", "articles": [
          {"title": "Vorbereitung", "bodyText": "<p>Lose Gegenstände auf Balkon und Terrasse sichern.</p>"}
        ]},
        {"title": "Hochwasser", "articles": [
          {"title": "Keller meiden", "bodyText": "<p>Bei steigendem Wasser <b>nicht</b> in den Keller gehen.</p>"}
        ]}
      ]
    },
    {
      "title": "Feuer",
      "tips": [
        {"title": "Brandschutz", "articles": [
          {"title": "Rauchmelder", "bodyText": "Rauchmelder regelmäßig testen.",
           "image": {"src": "rauchmelder.png", "title": "Rauchmelder", "alt": "Ein Rauchmelder", "hash": "abc"}}
        ]}
      ]
    }
  ],
  "lastModificationDate": 1700000000000
}"#;

/// English sample corpus
pub const SAMPLE_TIPS_EN: &str = r#"{
  "category": [
    {
      "title": "Household",
      "tips": [
        {"title": "Fire Safety at Home", "articles": [
          {"title": "Smoke alarms", "bodyText": "Test smoke alarms once a month."}
        ]},
        {"title": "Power outage", "articles": [
          {"title": "Lighting", "bodyText": "Use torches rather than candles to avoid a fire."}
        ]}
      ]
    },
    {
      "title": "Health",
      "tips": [
        {"title": "First aid kit", "articles": [
          {"title": "Contents", "bodyText": "Bandages, gloves and a safety blanket."}
        ]}
      ]
    }
  ]
}"#;

/// Build a record the way the flattener would
pub fn record(id: &str, category: &str, tip: &str, article: &str, body: &str) -> CorpusRecord {
    CorpusRecord {
        id: id.to_string(),
        category_title: category.to_string(),
        tip_title: tip.to_string(),
        article_title: article.to_string(),
        body_text: body.to_string(),
        searchable_text: [category, tip, article, strip_tags(body).as_str()]
            .join(" ")
            .to_lowercase(),
        event_codes: BTreeSet::new(),
        image: None,
    }
}

/// Write a non-empty stand-in model file and return its path
pub fn write_model_file(dir: &Path) -> String {
    let path = dir.join("model.onnx");
    std::fs::write(&path, b"fake-model").expect("write fake model");
    path.display().to_string()
}

// =============================================================================
// Fake inference runtime
// =============================================================================

/// Deterministic runtime: every token id maps to a fixed pseudo-random vector.
pub struct FakeRuntime {
    available: bool,
    fail_path: bool,
    fail_buffer: bool,
    crash_path: bool,
    hidden: usize,
    forward_delay_ms: Arc<AtomicU64>,
    fail_forward: Arc<AtomicBool>,
    path_loads: AtomicUsize,
    buffer_loads: AtomicUsize,
}

impl FakeRuntime {
    /// Width of the supported encoders
    pub const HIDDEN: usize = 384;

    pub fn new() -> Self {
        Self {
            available: true,
            fail_path: false,
            fail_buffer: false,
            crash_path: false,
            hidden: Self::HIDDEN,
            forward_delay_ms: Arc::new(AtomicU64::new(0)),
            fail_forward: Arc::new(AtomicBool::new(false)),
            path_loads: AtomicUsize::new(0),
            buffer_loads: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn fail_path_loads(mut self) -> Self {
        self.fail_path = true;
        self
    }

    pub fn fail_buffer_loads(mut self) -> Self {
        self.fail_buffer = true;
        self
    }

    /// Emit hidden states of `hidden` width instead of the model's
    pub fn with_hidden(mut self, hidden: usize) -> Self {
        self.hidden = hidden;
        self
    }

    /// Panic inside the path-based load, killing the worker
    pub fn crash_path_loads(mut self) -> Self {
        self.crash_path = true;
        self
    }

    pub fn with_forward_delay(self, delay: Duration) -> Self {
        self.slow_down(delay);
        self
    }

    /// Delay every later forward pass by `delay`
    pub fn slow_down(&self, delay: Duration) {
        self.forward_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Make every later forward pass fail
    pub fn break_inference(&self) {
        self.fail_forward.store(true, Ordering::SeqCst);
    }

    pub fn path_loads(&self) -> usize {
        self.path_loads.load(Ordering::SeqCst)
    }

    pub fn buffer_loads(&self) -> usize {
        self.buffer_loads.load(Ordering::SeqCst)
    }

    fn backend(&self, seq_len: usize) -> Box<dyn InferenceBackend> {
        Box::new(FakeBackend {
            seq_len,
            hidden: self.hidden,
            delay_ms: self.forward_delay_ms.clone(),
            fail: self.fail_forward.clone(),
        })
    }
}

impl InferenceRuntime for FakeRuntime {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn load_from_path(
        &self,
        _path: &Path,
        seq_len: usize,
    ) -> Result<Box<dyn InferenceBackend>, ModelError> {
        self.path_loads.fetch_add(1, Ordering::SeqCst);
        if self.crash_path {
            panic!("runtime crashed while loading");
        }
        if self.fail_path {
            return Err(ModelError::LoadFailed("path strategy disabled".into()));
        }
        Ok(self.backend(seq_len))
    }

    fn load_from_bytes(
        &self,
        bytes: &[u8],
        seq_len: usize,
    ) -> Result<Box<dyn InferenceBackend>, ModelError> {
        self.buffer_loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_buffer || bytes.is_empty() {
            return Err(ModelError::LoadFailed("buffer strategy disabled".into()));
        }
        Ok(self.backend(seq_len))
    }
}

struct FakeBackend {
    seq_len: usize,
    hidden: usize,
    delay_ms: Arc<AtomicU64>,
    fail: Arc<AtomicBool>,
}

impl FakeBackend {
    fn token_vector(id: i64, hidden: usize) -> impl Iterator<Item = f32> {
        (0..hidden as i64).map(move |k| {
            let mixed = (id.wrapping_mul(2_654_435_761) ^ (k + 1).wrapping_mul(40_503)) % 1000;
            mixed.abs() as f32 / 1000.0 - 0.5
        })
    }
}

impl InferenceBackend for FakeBackend {
    fn forward(&self, input: &TokenizedInput) -> Result<TokenEmbeddings, ModelError> {
        let delay_ms = self.delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(delay_ms));
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(ModelError::InferenceFailed("forward pass disabled".into()));
        }

        let mut data = Vec::with_capacity(self.seq_len * self.hidden);
        for (&id, &mask) in input.ids.iter().zip(&input.attention_mask) {
            if mask == 0 {
                // Padding must never reach the pooled vector
                data.extend(std::iter::repeat(1000.0).take(self.hidden));
            } else {
                data.extend(Self::token_vector(id, self.hidden));
            }
        }
        TokenEmbeddings::new(data, input.len(), self.hidden)
    }
}

// =============================================================================
// Fake embedder and fetcher
// =============================================================================

/// Letter-frequency embedder: texts sharing letters point the same way.
/// Texts containing any of `refuse` get no vector.
#[derive(Default)]
pub struct LetterEmbedder {
    pub refuse: Vec<String>,
    pub calls: AtomicUsize,
}

impl LetterEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing(words: &[&str]) -> Self {
        Self {
            refuse: words.iter().map(|w| w.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; 26];
        for c in text.to_lowercase().chars() {
            if c.is_ascii_lowercase() {
                v[(c as u8 - b'a') as usize] += 1.0;
            }
        }
        v
    }
}

#[async_trait]
impl TextEmbedder for LetterEmbedder {
    async fn embed(&self, text: &str, _role: TextRole) -> Option<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.refuse.iter().any(|w| text.contains(w.as_str())) {
            return None;
        }
        Some(Self::vector(text))
    }
}

/// Fetcher serving a fixed payload and counting requests
pub struct CountingFetcher {
    payload: Option<Vec<u8>>,
    calls: AtomicUsize,
}

impl CountingFetcher {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload: Some(payload),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            payload: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactFetcher for CountingFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payload
            .clone()
            .ok_or_else(|| FetchError::Http(format!("{} unreachable", url)))
    }
}
