// aidcore/src/embeddings/session.rs
//
// Encoder Session Manager
//
// Owns the encoder lifecycle. The state machine is
//
//   Uninitialized -> Loading -> Ready(NeuralEncoder)
//                            -> Ready(LexicalFallback)
//                            -> Failed(kind)
//
// and it is the only place that decides whether embedding is permitted.
// Runtime unavailability, an unresolvable artifact and a session that cannot
// be constructed all end in Ready(LexicalFallback). Failed is kept for a
// worker that died mid-load; callers treat it like text mode.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::artifact::{ArtifactFetcher, ArtifactResolver, ModelLocation};
use super::config::EncoderConfig;
use super::model::{l2_normalize, mean_pool, InferenceBackend, InferenceRuntime};
use super::progress::{LoadProgress, ProgressReporter};
use super::tokenize::{CharTokenizer, EmbedTokenizer, Tokenize};
use crate::error::{ErrorKind, RetrievalError};

/// Which marker an input is embedded with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRole {
    Query,
    Passage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    NeuralEncoder,
    LexicalFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Loading { progress: u8, stage: String },
    Ready(SessionMode),
    Failed(ErrorKind),
}

impl SessionState {
    /// Ready or Failed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready(_) | Self::Failed(_))
    }

    /// Mode callers should act on; `None` while not settled
    pub fn effective_mode(&self) -> Option<SessionMode> {
        match self {
            Self::Ready(mode) => Some(*mode),
            Self::Failed(_) => Some(SessionMode::LexicalFallback),
            _ => None,
        }
    }
}

/// Anything that can embed text on demand.
///
/// `None` means "no vector for this input"; the caller takes the lexical path.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed(&self, text: &str, role: TextRole) -> Option<Vec<f32>>;
}

/// A constructed encoder plus everything needed to run it
struct LoadedEncoder {
    backend: Box<dyn InferenceBackend>,
    tokenizer: Box<dyn Tokenize>,
    seq_len: usize,
    /// Width every pooled vector must have
    dimensions: usize,
    query_prefix: String,
    passage_prefix: String,
    normalize: bool,
}

impl LoadedEncoder {
    fn embed(&self, text: &str, role: TextRole) -> Result<Vec<f32>, RetrievalError> {
        let prefix = match role {
            TextRole::Query => &self.query_prefix,
            TextRole::Passage => &self.passage_prefix,
        };
        let input = self
            .tokenizer
            .tokenize(&format!("{}{}", prefix, text), self.seq_len)
            .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))?;

        let tokens = self
            .backend
            .forward(&input)
            .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))?;
        if tokens.seq_len() != input.len() || tokens.hidden() == 0 {
            return Err(RetrievalError::EmbeddingFailed(format!(
                "unexpected output shape [{}, {}] for {} tokens",
                tokens.seq_len(),
                tokens.hidden(),
                input.len()
            )));
        }

        if tokens.hidden() != self.dimensions {
            return Err(RetrievalError::EmbeddingFailed(format!(
                "encoder produced {}-dimensional vectors, expected {}",
                tokens.hidden(),
                self.dimensions
            )));
        }

        let mut vector = mean_pool(&tokens, &input.attention_mask);
        if self.normalize {
            l2_normalize(&mut vector);
        }
        Ok(vector)
    }
}

enum LoadOutcome {
    Neural(LoadedEncoder),
    /// Degraded mode; the error, if any, is kept for diagnostics
    Fallback(Option<RetrievalError>),
    Failed(RetrievalError),
}

/// Owns one encoder session at a time.
pub struct EncoderSession {
    config: EncoderConfig,
    runtime: Arc<dyn InferenceRuntime>,
    fetcher: Arc<dyn ArtifactFetcher>,
    state: RwLock<SessionState>,
    encoder: RwLock<Option<Arc<LoadedEncoder>>>,
    /// Bumped by `dispose`; work started under an older value is discarded
    generation: AtomicU64,
    load_lock: tokio::sync::Mutex<()>,
    progress: ProgressReporter,
    last_error: RwLock<Option<RetrievalError>>,
}

impl EncoderSession {
    pub fn new(
        config: EncoderConfig,
        runtime: Arc<dyn InferenceRuntime>,
        fetcher: Arc<dyn ArtifactFetcher>,
    ) -> Self {
        Self {
            config,
            runtime,
            fetcher,
            state: RwLock::new(SessionState::Uninitialized),
            encoder: RwLock::new(None),
            generation: AtomicU64::new(0),
            load_lock: tokio::sync::Mutex::new(()),
            progress: ProgressReporter::new(),
            last_error: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn mode(&self) -> Option<SessionMode> {
        self.state.read().effective_mode()
    }

    pub fn is_neural(&self) -> bool {
        *self.state.read() == SessionState::Ready(SessionMode::NeuralEncoder)
    }

    pub fn load_progress(&self) -> LoadProgress {
        self.progress.current()
    }

    pub fn subscribe_progress(&self) -> tokio::sync::watch::Receiver<LoadProgress> {
        self.progress.subscribe()
    }

    /// Most recent internal error, for diagnostics only
    pub fn last_error(&self) -> Option<RetrievalError> {
        self.last_error.read().clone()
    }

    /// Artifact resolver for the configured location
    pub fn artifact_resolver(&self) -> Result<ArtifactResolver, RetrievalError> {
        let location = ModelLocation::parse(&self.config.model_location)?;
        Ok(ArtifactResolver::new(
            location,
            self.config.cache_dir.clone(),
            self.fetcher.clone(),
        ))
    }

    /// Run the load sequence unless the session already settled.
    ///
    /// Never fails: every problem ends in text mode. Concurrent callers wait
    /// for the first load and share its result.
    #[instrument(skip_all, fields(model = %self.config.model, runtime = self.runtime.name()))]
    pub async fn load(&self) -> SessionMode {
        let _guard = self.load_lock.lock().await;

        if let Some(mode) = self.mode() {
            return mode;
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let started = instant::Instant::now();
        *self.last_error.write() = None;
        self.progress.reset();

        let outcome = self.run_load(generation).await;

        let mut state = self.state.write();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Load finished after dispose, discarding");
            return SessionMode::LexicalFallback;
        }

        let mode = match outcome {
            LoadOutcome::Neural(encoder) => {
                *self.encoder.write() = Some(Arc::new(encoder));
                *state = SessionState::Ready(SessionMode::NeuralEncoder);
                self.progress.report(100, "Ready");
                SessionMode::NeuralEncoder
            }
            LoadOutcome::Fallback(err) => {
                if let Some(err) = err {
                    warn!(error = %err, "Encoder unavailable, using text mode");
                    *self.last_error.write() = Some(err);
                }
                *state = SessionState::Ready(SessionMode::LexicalFallback);
                self.progress.report(100, "Ready (Text mode)");
                SessionMode::LexicalFallback
            }
            LoadOutcome::Failed(err) => {
                error!(error = %err, "Encoder load failed");
                *state = SessionState::Failed(err.kind());
                *self.last_error.write() = Some(err);
                self.progress.report(100, "Ready (Text mode)");
                SessionMode::LexicalFallback
            }
        };

        info!(
            ?mode,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Encoder session settled"
        );
        mode
    }

    async fn run_load(&self, generation: u64) -> LoadOutcome {
        self.set_loading(generation, 10, "Initialization");

        if !self.runtime.is_available() {
            info!("No inference runtime on this build, using text mode");
            return LoadOutcome::Fallback(None);
        }

        self.set_loading(generation, 30, "Resolving model asset");
        let path = match self.resolve_artifact().await {
            Ok(path) => path,
            Err(err) => return LoadOutcome::Fallback(Some(err)),
        };
        self.set_loading(generation, 60, "Model asset resolved");

        let tokenizer = self.load_tokenizer().await;

        self.set_loading(generation, 70, "Loading ONNX model");
        let backend = match self.construct_backend(path).await {
            Ok(backend) => backend,
            Err(outcome) => return outcome,
        };

        LoadOutcome::Neural(LoadedEncoder {
            backend,
            tokenizer,
            seq_len: self.config.effective_max_length(),
            dimensions: self.config.model.dimensions(),
            query_prefix: self.config.query_prefix().to_string(),
            passage_prefix: self.config.passage_prefix().to_string(),
            normalize: self.config.normalize,
        })
    }

    async fn resolve_artifact(&self) -> Result<PathBuf, RetrievalError> {
        self.artifact_resolver()?.resolve().await
    }

    async fn load_tokenizer(&self) -> Box<dyn Tokenize> {
        let Some(path) = self.config.tokenizer_path.clone() else {
            debug!("No tokenizer configured, using code-point tokenizer");
            return Box::new(CharTokenizer);
        };

        let loaded = tokio::task::spawn_blocking(move || EmbedTokenizer::from_file(&path)).await;
        match loaded {
            Ok(Ok(tokenizer)) => Box::new(tokenizer),
            Ok(Err(e)) => {
                warn!(error = %e, "Tokenizer load failed, using code-point tokenizer");
                Box::new(CharTokenizer)
            }
            Err(e) => {
                warn!(error = %e, "Tokenizer worker failed, using code-point tokenizer");
                Box::new(CharTokenizer)
            }
        }
    }

    /// Path strategy first, then the same file through an in-memory buffer.
    /// Both failing is text mode; a worker that died is `Failed`.
    async fn construct_backend(
        &self,
        path: PathBuf,
    ) -> Result<Box<dyn InferenceBackend>, LoadOutcome> {
        let seq_len = self.config.effective_max_length();

        let runtime = self.runtime.clone();
        let model_path = path.clone();
        let path_error =
            match tokio::task::spawn_blocking(move || runtime.load_from_path(&model_path, seq_len))
                .await
            {
                Ok(Ok(backend)) => return Ok(backend),
                Ok(Err(e)) => e.to_string(),
                Err(join) => return Err(LoadOutcome::Failed(worker_died(join))),
            };
        warn!(error = %path_error, "Path-based session construction failed, retrying from buffer");

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return Err(LoadOutcome::Fallback(Some(
                    RetrievalError::SessionConstructionFailed {
                        path_error,
                        buffer_error: format!("cannot read {}: {}", path.display(), e),
                    },
                )))
            }
        };

        let runtime = self.runtime.clone();
        match tokio::task::spawn_blocking(move || runtime.load_from_bytes(&bytes, seq_len)).await {
            Ok(Ok(backend)) => Ok(backend),
            Ok(Err(e)) => Err(LoadOutcome::Fallback(Some(
                RetrievalError::SessionConstructionFailed {
                    path_error,
                    buffer_error: e.to_string(),
                },
            ))),
            Err(join) => Err(LoadOutcome::Failed(worker_died(join))),
        }
    }

    fn set_loading(&self, generation: u64, progress: u8, stage: &str) {
        let mut state = self.state.write();
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        *state = SessionState::Loading {
            progress,
            stage: stage.to_string(),
        };
        self.progress.report(progress, stage);
    }

    /// Embed `text`, or `None` unless the session is in neural mode.
    ///
    /// Errors degrade this one call only; they are logged and recorded.
    pub async fn embed(&self, text: &str, role: TextRole) -> Option<Vec<f32>> {
        match self.try_embed(text, role).await {
            Ok(vector) => vector,
            Err(err) => {
                warn!(error = %err, "Embedding failed for one input");
                *self.last_error.write() = Some(err);
                None
            }
        }
    }

    async fn try_embed(
        &self,
        text: &str,
        role: TextRole,
    ) -> Result<Option<Vec<f32>>, RetrievalError> {
        let (generation, encoder) = {
            let state = self.state.read();
            if *state != SessionState::Ready(SessionMode::NeuralEncoder) {
                return Ok(None);
            }
            match self.encoder.read().clone() {
                Some(encoder) => (self.generation.load(Ordering::SeqCst), encoder),
                None => return Ok(None),
            }
        };

        let text = text.to_owned();
        let vector = tokio::task::spawn_blocking(move || encoder.embed(&text, role))
            .await
            .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))??;

        // A dispose while the forward pass ran invalidates the result
        if self.generation.load(Ordering::SeqCst) != generation {
            return Ok(None);
        }
        Ok(Some(vector))
    }

    /// Release the encoder. Idempotent, safe during a load.
    pub fn dispose(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write();
        let released = self.encoder.write().take().is_some();
        *state = SessionState::Uninitialized;
        self.progress.reset();
        if released {
            info!("Encoder session released");
        }
    }
}

#[async_trait]
impl TextEmbedder for EncoderSession {
    async fn embed(&self, text: &str, role: TextRole) -> Option<Vec<f32>> {
        EncoderSession::embed(self, text, role).await
    }
}

fn worker_died(join: tokio::task::JoinError) -> RetrievalError {
    RetrievalError::SessionConstructionFailed {
        path_error: format!("load worker died: {}", join),
        buffer_error: "not attempted".to_string(),
    }
}
