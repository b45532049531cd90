// aidcore/src/embeddings/model.rs
//
// ONNX model inference via tract
//
// `InferenceRuntime` is the seam between the session manager and whatever can
// execute the encoder. The tract runtime is compiled in with the `onnx`
// feature; without it the runtime reports itself unavailable and the session
// goes straight to text mode.

use std::path::Path;
use thiserror::Error;

use crate::embeddings::tokenize::TokenizedInput;

/// Model loading and inference errors
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("Inference runtime unavailable: {0}")]
    RuntimeUnavailable(String),
    #[error("Model load failed: {0}")]
    LoadFailed(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Shape error: {0}")]
    ShapeError(String),
}

/// Per-token hidden states of a single sequence, row-major `[seq_len, hidden]`
#[derive(Debug, Clone, PartialEq)]
pub struct TokenEmbeddings {
    data: Vec<f32>,
    seq_len: usize,
    hidden: usize,
}

impl TokenEmbeddings {
    pub fn new(data: Vec<f32>, seq_len: usize, hidden: usize) -> Result<Self, ModelError> {
        if data.len() != seq_len * hidden {
            return Err(ModelError::ShapeError(format!(
                "expected {}x{} values, got {}",
                seq_len,
                hidden,
                data.len()
            )));
        }
        Ok(Self {
            data,
            seq_len,
            hidden,
        })
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn hidden(&self) -> usize {
        self.hidden
    }

    pub fn row(&self, position: usize) -> &[f32] {
        &self.data[position * self.hidden..(position + 1) * self.hidden]
    }
}

/// Mean pooling: sum(embeddings * mask) / sum(mask)
///
/// An all-zero mask yields the zero vector.
pub fn mean_pool(tokens: &TokenEmbeddings, attention_mask: &[i64]) -> Vec<f32> {
    let mut sum = vec![0.0f32; tokens.hidden()];
    let mut count = 0.0f32;

    for (j, &m) in attention_mask.iter().enumerate().take(tokens.seq_len()) {
        if m > 0 {
            for (k, val) in tokens.row(j).iter().enumerate() {
                sum[k] += val;
            }
            count += 1.0;
        }
    }

    if count > 0.0 {
        sum.iter_mut().for_each(|v| *v /= count);
    }

    sum
}

/// L2 normalize in place; zero vectors are left untouched
pub fn l2_normalize(embedding: &mut [f32]) {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        embedding.iter_mut().for_each(|x| *x /= norm);
    }
}

/// A constructed session that can run forward passes.
pub trait InferenceBackend: Send + Sync {
    /// Run one sequence through the encoder, returning its last hidden state
    fn forward(&self, input: &TokenizedInput) -> Result<TokenEmbeddings, ModelError>;
}

/// Something able to construct inference sessions on this platform/build.
///
/// Loading is blocking and is always called from a blocking worker.
pub trait InferenceRuntime: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    /// Construct a session from a local file path
    fn load_from_path(
        &self,
        path: &Path,
        seq_len: usize,
    ) -> Result<Box<dyn InferenceBackend>, ModelError>;

    /// Construct a session from the model bytes held in memory
    fn load_from_bytes(
        &self,
        bytes: &[u8],
        seq_len: usize,
    ) -> Result<Box<dyn InferenceBackend>, ModelError>;
}

// =============================================================================
// tract runtime
// =============================================================================

/// Pure-Rust ONNX runtime backed by `tract-onnx`
#[derive(Debug, Clone, Copy, Default)]
pub struct TractRuntime;

#[cfg(feature = "onnx")]
mod tract_impl {
    use super::*;
    use std::sync::Arc;
    use tract_onnx::prelude::*;

    /// Type alias for the tract typed model
    type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

    pub(super) struct TractBackend {
        model: Arc<TractModel>,
        seq_len: usize,
        input_count: usize,
    }

    /// Pin every input to `[1, seq_len]` i64, then optimize
    pub(super) fn prepare(
        model: InferenceModel,
        seq_len: usize,
    ) -> Result<Box<dyn InferenceBackend>, ModelError> {
        let input_count = model.inputs.len();
        if !(2..=3).contains(&input_count) {
            return Err(ModelError::LoadFailed(format!(
                "expected 2 or 3 model inputs, found {}",
                input_count
            )));
        }

        let mut model = model;
        for i in 0..input_count {
            model = model
                .with_input_fact(i, i64::fact([1, seq_len]).into())
                .map_err(|e| ModelError::LoadFailed(e.to_string()))?;
        }

        let plan = model
            .into_optimized()
            .map_err(|e| ModelError::LoadFailed(e.to_string()))?
            .into_runnable()
            .map_err(|e| ModelError::LoadFailed(e.to_string()))?;

        Ok(Box::new(TractBackend {
            model: Arc::new(plan),
            seq_len,
            input_count,
        }))
    }

    impl TractBackend {
        fn tensor(&self, values: &[i64]) -> Result<Tensor, ModelError> {
            Tensor::from_shape(&[1, self.seq_len], values)
                .map_err(|e| ModelError::ShapeError(e.to_string()))
        }
    }

    impl InferenceBackend for TractBackend {
        fn forward(&self, input: &TokenizedInput) -> Result<TokenEmbeddings, ModelError> {
            if input.len() != self.seq_len {
                return Err(ModelError::ShapeError(format!(
                    "session expects {} tokens, got {}",
                    self.seq_len,
                    input.len()
                )));
            }

            let mut inputs: TVec<TValue> = tvec![
                self.tensor(&input.ids)?.into(),
                self.tensor(&input.attention_mask)?.into(),
            ];
            if self.input_count == 3 {
                // token_type_ids: single segment
                inputs.push(self.tensor(&vec![0i64; self.seq_len])?.into());
            }

            let outputs = self
                .model
                .run(inputs)
                .map_err(|e| ModelError::InferenceFailed(e.to_string()))?;

            // BERT models output: (batch_size, seq_len, hidden_size)
            let view = outputs[0]
                .to_array_view::<f32>()
                .map_err(|e| ModelError::ShapeError(e.to_string()))?;
            let shape = view.shape().to_vec();
            if shape.len() != 3 || shape[0] != 1 {
                return Err(ModelError::ShapeError(format!(
                    "expected [1, seq, hidden] output, got {:?}",
                    shape
                )));
            }

            TokenEmbeddings::new(view.iter().copied().collect(), shape[1], shape[2])
        }
    }
}

#[cfg(feature = "onnx")]
impl InferenceRuntime for TractRuntime {
    fn name(&self) -> &'static str {
        "tract-onnx"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn load_from_path(
        &self,
        path: &Path,
        seq_len: usize,
    ) -> Result<Box<dyn InferenceBackend>, ModelError> {
        use tract_onnx::prelude::*;

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| ModelError::LoadFailed(e.to_string()))?;
        tract_impl::prepare(model, seq_len)
    }

    fn load_from_bytes(
        &self,
        bytes: &[u8],
        seq_len: usize,
    ) -> Result<Box<dyn InferenceBackend>, ModelError> {
        use tract_onnx::prelude::*;

        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(bytes))
            .map_err(|e| ModelError::LoadFailed(e.to_string()))?;
        tract_impl::prepare(model, seq_len)
    }
}

#[cfg(not(feature = "onnx"))]
impl InferenceRuntime for TractRuntime {
    fn name(&self) -> &'static str {
        "tract-onnx (disabled)"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn load_from_path(
        &self,
        _path: &Path,
        _seq_len: usize,
    ) -> Result<Box<dyn InferenceBackend>, ModelError> {
        Err(ModelError::RuntimeUnavailable(
            "built without the `onnx` feature".to_string(),
        ))
    }

    fn load_from_bytes(
        &self,
        _bytes: &[u8],
        _seq_len: usize,
    ) -> Result<Box<dyn InferenceBackend>, ModelError> {
        Err(ModelError::RuntimeUnavailable(
            "built without the `onnx` feature".to_string(),
        ))
    }
}
