//! Query Orchestrator
//!
//! [`Assistant`] is the handle the UI layer owns. It loads the corpus and the
//! encoder side by side, builds the embedding index when the encoder came up,
//! and answers every query through exactly one decision:
//!
//! ```text
//! session neural? ── no ──────────────────────────────┐
//!      │ yes                                          │
//! embed query (bounded) ── None / timeout ────────────┤
//!      │                                              ▼
//! rank against index ── empty ──────────────► lexical matcher
//!      │
//!   results
//! ```
//!
//! Queries never fail. The worst answer is an empty list.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use super::emergency::detect_emergency_kind;
use super::reply::AssistantReply;
use crate::config::AssistConfig;
use crate::corpus::{load_records, CorpusRecord, CorpusSource, DirectoryCorpus, Locale};
use crate::embeddings::{
    ArtifactFetcher, EncoderSession, HttpFetcher, InferenceRuntime, LoadProgress, SessionMode,
    TextRole, TractRuntime,
};
use crate::error::RetrievalError;
use crate::search::{rank, EmbeddingIndex, LexicalMatcher};

/// Which path answers queries right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Semantic,
    Lexical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Loading,
    Indexing,
    Settled,
    /// The corpus could not be loaded
    Failed,
}

struct Inner {
    config: AssistConfig,
    session: EncoderSession,
    corpus_source: Arc<dyn CorpusSource>,
    matcher: LexicalMatcher,
    locale: RwLock<Locale>,
    corpus: RwLock<Option<Arc<[CorpusRecord]>>>,
    index: RwLock<Option<Arc<EmbeddingIndex>>>,
    phase: RwLock<Phase>,
    /// Bumped by `dispose` and `reload`; stale loads drop their results
    generation: AtomicU64,
    /// Serializes load sequences, and with them index builds
    load_lock: tokio::sync::Mutex<()>,
}

impl Inner {
    /// Run `apply` under the phase lock if `generation` is still current
    fn commit(&self, generation: u64, apply: impl FnOnce(&mut Phase)) -> bool {
        let mut phase = self.phase.write();
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        apply(&mut phase);
        true
    }

    /// Bump the generation and drop corpus and index together
    fn tear_down(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut phase = self.phase.write();
        *self.corpus.write() = None;
        *self.index.write() = None;
        *phase = Phase::Idle;
    }
}

/// Builder for [`Assistant`] with injectable collaborators
pub struct AssistantBuilder {
    config: AssistConfig,
    runtime: Option<Arc<dyn InferenceRuntime>>,
    fetcher: Option<Arc<dyn ArtifactFetcher>>,
    corpus_source: Option<Arc<dyn CorpusSource>>,
}

impl AssistantBuilder {
    pub fn runtime(mut self, runtime: Arc<dyn InferenceRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn corpus_source(mut self, source: Arc<dyn CorpusSource>) -> Self {
        self.corpus_source = Some(source);
        self
    }

    pub fn build(self) -> Assistant {
        let runtime = self.runtime.unwrap_or_else(|| Arc::new(TractRuntime));
        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(HttpFetcher::new()));
        let corpus_source = self
            .corpus_source
            .unwrap_or_else(|| Arc::new(DirectoryCorpus::new(self.config.corpus_dir.clone())));

        let session = EncoderSession::new(self.config.encoder.clone(), runtime, fetcher);
        let matcher = LexicalMatcher::new(self.config.retrieval.lexical);
        let locale = self.config.locale;

        Assistant {
            inner: Arc::new(Inner {
                config: self.config,
                session,
                corpus_source,
                matcher,
                locale: RwLock::new(locale),
                corpus: RwLock::new(None),
                index: RwLock::new(None),
                phase: RwLock::new(Phase::Idle),
                generation: AtomicU64::new(0),
                load_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }
}

/// Owned handle to the retrieval core. Cloning shares the same instance.
#[derive(Clone)]
pub struct Assistant {
    inner: Arc<Inner>,
}

impl Assistant {
    /// Assistant with the default runtime, fetcher and bundled corpus directory
    pub fn new(config: AssistConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: AssistConfig) -> AssistantBuilder {
        AssistantBuilder {
            config,
            runtime: None,
            fetcher: None,
            corpus_source: None,
        }
    }

    pub fn config(&self) -> &AssistConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &EncoderSession {
        &self.inner.session
    }

    pub fn locale(&self) -> Locale {
        *self.inner.locale.read()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Load the corpus and the encoder, then build the index.
    ///
    /// Only a malformed or missing corpus is an error. Returns immediately
    /// when already loaded.
    #[instrument(skip_all, fields(locale = %self.locale()))]
    pub async fn load(&self) -> Result<(), RetrievalError> {
        let inner = &self.inner;
        let _guard = inner.load_lock.lock().await;

        if *inner.phase.read() == Phase::Settled {
            return Ok(());
        }

        let generation = inner.generation.load(Ordering::SeqCst);
        let locale = *inner.locale.read();
        let started = instant::Instant::now();
        inner.commit(generation, |phase| *phase = Phase::Loading);

        let (records, mode) = tokio::join!(
            load_records(inner.corpus_source.as_ref(), locale),
            inner.session.load()
        );

        let records: Arc<[CorpusRecord]> = match records {
            Ok(records) => records.into(),
            Err(err) => {
                error!(error = %err, "Corpus load failed");
                inner.commit(generation, |phase| *phase = Phase::Failed);
                return Err(err);
            }
        };

        if !inner.commit(generation, |_| *inner.corpus.write() = Some(records.clone())) {
            debug!("Load superseded, discarding corpus");
            return Ok(());
        }

        if mode == SessionMode::NeuralEncoder {
            inner.commit(generation, |phase| *phase = Phase::Indexing);
            let index = EmbeddingIndex::build(&records, &inner.session).await;
            if !inner.commit(generation, |_| *inner.index.write() = Some(Arc::new(index))) {
                debug!("Load superseded, discarding index");
                return Ok(());
            }
        }

        inner.commit(generation, |phase| *phase = Phase::Settled);
        info!(
            records = records.len(),
            mode = ?self.mode(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Assistant ready"
        );
        Ok(())
    }

    /// Run [`load`](Self::load) on the tokio runtime without waiting for it
    pub fn spawn_load(&self) -> JoinHandle<Result<(), RetrievalError>> {
        let this = self.clone();
        tokio::spawn(async move { this.load().await })
    }

    /// Switch corpus locale. Corpus and index are rebuilt; the encoder stays.
    pub async fn reload(&self, locale: Locale) -> Result<(), RetrievalError> {
        {
            let _guard = self.inner.load_lock.lock().await;
            self.inner.tear_down();
            *self.inner.locale.write() = locale;
        }
        info!(%locale, "Reloading corpus");
        self.load().await
    }

    /// Release corpus, index and encoder. Idempotent, safe during a load.
    pub fn dispose(&self) {
        self.inner.tear_down();
        self.inner.session.dispose();
        debug!("Assistant disposed");
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// True once the load sequence has settled with a usable corpus
    pub fn is_ready(&self) -> bool {
        *self.inner.phase.read() == Phase::Settled
    }

    /// Overall progress: encoder load mapped onto 0..=90, indexing at 95,
    /// 100 once settled.
    pub fn load_progress(&self) -> LoadProgress {
        let phase = *self.inner.phase.read();
        match phase {
            Phase::Idle => LoadProgress::idle(),
            Phase::Loading => {
                let session = self.inner.session.load_progress();
                let scaled = (u16::from(session.progress) * 90 / 100) as u8;
                LoadProgress::new(scaled, session.stage)
            }
            Phase::Indexing => LoadProgress::new(95, "Building search index"),
            Phase::Settled => match self.mode() {
                SearchMode::Semantic => LoadProgress::new(100, "Ready"),
                SearchMode::Lexical => LoadProgress::new(100, "Ready (Text mode)"),
            },
            Phase::Failed => LoadProgress::new(100, "Tips unavailable"),
        }
    }

    pub fn mode(&self) -> SearchMode {
        let indexed = self
            .inner
            .index
            .read()
            .as_ref()
            .is_some_and(|index| !index.is_empty());
        if indexed && self.inner.session.is_neural() {
            SearchMode::Semantic
        } else {
            SearchMode::Lexical
        }
    }

    /// Number of records currently loaded
    pub fn corpus_len(&self) -> usize {
        self.inner.corpus.read().as_ref().map_or(0, |c| c.len())
    }

    /// Number of vectors currently indexed
    pub fn index_len(&self) -> usize {
        self.inner.index.read().as_ref().map_or(0, |i| i.len())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Most relevant records for `query`, `top_k` defaulting to the configured
    /// count. Never fails; empty when nothing matches or nothing is loaded.
    #[instrument(skip_all, fields(top_k = tracing::field::Empty))]
    pub async fn search(&self, query: &str, top_k: Option<usize>) -> Vec<CorpusRecord> {
        let top_k = top_k.unwrap_or(self.inner.config.retrieval.top_k);
        tracing::Span::current().record("top_k", top_k as u64);

        let Some(records) = self.inner.corpus.read().clone() else {
            debug!("Corpus not loaded, nothing to search");
            return Vec::new();
        };
        if top_k == 0 {
            return Vec::new();
        }

        if let Some(results) = self.semantic_search(query, &records, top_k).await {
            debug!(results = results.len(), "Answered semantically");
            return results;
        }

        let results = self.inner.matcher.search(query, &records, top_k);
        debug!(results = results.len(), "Answered lexically");
        results
    }

    /// `None` whenever the lexical path has to answer instead
    async fn semantic_search(
        &self,
        query: &str,
        records: &[CorpusRecord],
        top_k: usize,
    ) -> Option<Vec<CorpusRecord>> {
        let inner = &self.inner;
        if !inner.session.is_neural() {
            return None;
        }
        let index = inner.index.read().clone()?;

        let timeout = inner.config.retrieval.query_timeout();
        let vector = match tokio::time::timeout(timeout, inner.session.embed(query, TextRole::Query))
            .await
        {
            Ok(Some(vector)) => vector,
            Ok(None) => return None,
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Query embedding timed out");
                return None;
            }
        };

        let ranked = rank(&vector, &index, records, top_k);
        if ranked.is_empty() {
            return None;
        }
        Some(ranked.into_iter().map(|scored| scored.record).collect())
    }

    /// Structured answer for the chat surface
    pub async fn respond(&self, query: &str) -> AssistantReply {
        let kind = detect_emergency_kind(query);
        let records = self.search(query, None).await;
        AssistantReply::compose(kind, &records, self.inner.config.retrieval.snippet_chars)
    }
}
