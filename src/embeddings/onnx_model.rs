// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX Embedding Model Wrapper
//!
//! Runs a sentence transformer exported to ONNX through ONNX Runtime.
//!
//! Features:
//! - ONNX model loading from disk
//! - Optional CUDA acceleration (`cuda` feature) with CPU fallback
//! - HF tokenizer with truncation to the model's max sequence length
//! - Batch inference padded to the longest sequence in the batch
//! - Mask-aware pooling as configured by the model
//! - Output dimension detected at load time

use super::{l2_normalize, EmbeddingModel, ModelFiles, PoolingStrategy};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use ndarray::{Array2, ArrayView2, ArrayViewD, Axis, Ix2, Ix3};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::{Encoding, Tokenizer, TruncationParams};
use tracing::{debug, info};

/// Truncation length used when the model does not declare one
pub const DEFAULT_MAX_SEQ_LENGTH: usize = 512;

/// ONNX-based sentence embedding model
///
/// # Thread Safety
/// All fields are wrapped in Arc for cheap cloning. The session sits behind
/// a mutex because ONNX Runtime runs need exclusive access to it.
#[derive(Clone)]
pub struct OnnxEmbeddingModel {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
    dimension: usize,
    max_length: usize,
    pooling: PoolingStrategy,
    /// BERT-style graphs take segment ids; RoBERTa-style graphs do not
    uses_token_type_ids: bool,
}

impl std::fmt::Debug for OnnxEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingModel")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("max_length", &self.max_length)
            .field("pooling", &self.pooling)
            .field("uses_token_type_ids", &self.uses_token_type_ids)
            .finish_non_exhaustive()
    }
}

impl OnnxEmbeddingModel {
    /// Loads the model and tokenizer and runs one validation inference.
    ///
    /// This is blocking; call it from a blocking context.
    ///
    /// # Errors
    /// Returns error if:
    /// - Model or tokenizer file is missing or invalid
    /// - ONNX Runtime initialization fails
    /// - The validation inference fails or yields an empty vector
    pub fn new(
        model_name: impl Into<String>,
        files: &ModelFiles,
        intra_threads: usize,
    ) -> Result<Self> {
        let model_name = model_name.into();

        if !files.model_path.exists() {
            bail!("ONNX model file not found: {}", files.model_path.display());
        }
        if !files.tokenizer_path.exists() {
            bail!("Tokenizer file not found: {}", files.tokenizer_path.display());
        }

        let mut session = build_session(&files.model_path, intra_threads)?;
        info!(model = %model_name, "ONNX embedding session created");

        let max_length = files.max_seq_length.unwrap_or(DEFAULT_MAX_SEQ_LENGTH);

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
        // Batches are padded here, not by the tokenizer config
        tokenizer.with_padding(None);

        let uses_token_type_ids = session
            .inputs
            .iter()
            .any(|input| input.name == "token_type_ids");

        // Validation inference doubles as dimension detection
        let dimension = {
            let encoding = tokenizer
                .encode("validation test", true)
                .map_err(|e| anyhow!("Tokenizer validation failed: {}", e))?;
            let outputs = run_inference(
                &mut session,
                &[encoding],
                files.pooling,
                uses_token_type_ids,
            )
            .context("Validation inference failed")?;
            outputs.first().map(Vec::len).unwrap_or(0)
        };

        if dimension == 0 {
            bail!("Model {} produced an empty embedding during validation", model_name);
        }

        info!(
            model = %model_name,
            dimension,
            max_length,
            pooling = ?files.pooling,
            "ONNX embedding model loaded"
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name,
            dimension,
            max_length,
            pooling: files.pooling,
            uses_token_type_ids,
        })
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn pooling(&self) -> PoolingStrategy {
        self.pooling
    }

    /// Synchronous batch encoding; the whole batch is one ONNX run
    pub fn encode_blocking(&self, texts: &[String], normalize: bool) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings: Vec<Encoding> = texts
            .iter()
            .map(|text| {
                self.tokenizer
                    .encode(text.as_str(), true)
                    .map_err(|e| anyhow!("Tokenization failed: {}", e))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut embeddings = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow!("ONNX session lock poisoned"))?;
            run_inference(
                &mut session,
                &encodings,
                self.pooling,
                self.uses_token_type_ids,
            )?
        };

        if embeddings.len() != texts.len() {
            bail!(
                "Model returned {} embeddings for {} inputs",
                embeddings.len(),
                texts.len()
            );
        }

        for (i, emb) in embeddings.iter().enumerate() {
            if emb.len() != self.dimension {
                bail!(
                    "Unexpected embedding dimension at index {}: {} (expected {})",
                    i,
                    emb.len(),
                    self.dimension
                );
            }
        }

        if normalize {
            for emb in &mut embeddings {
                l2_normalize(emb);
            }
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingModel for OnnxEmbeddingModel {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, texts: &[String], normalize: bool) -> Result<Vec<Vec<f32>>> {
        let model = self.clone();
        let texts = texts.to_vec();
        let count = texts.len();
        let start = std::time::Instant::now();

        let result = tokio::task::spawn_blocking(move || model.encode_blocking(&texts, normalize))
            .await
            .map_err(|e| anyhow!("Embedding task failed: {}", e))?;

        debug!(
            count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "ONNX batch encoded"
        );
        result
    }
}

fn build_session(model_path: &Path, intra_threads: usize) -> Result<Session> {
    #[cfg(feature = "cuda")]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        use tracing::warn;

        info!("Attempting CUDA execution provider");
        let cuda_result = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CUDAExecutionProvider::default().build()])
            .context("Failed to set CUDA execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path);

        match cuda_result {
            Ok(session) => {
                info!("CUDA execution provider initialized");
                return Ok(session);
            }
            Err(e) => {
                warn!("CUDA execution provider failed: {}", e);
                warn!("Falling back to CPU execution provider");
            }
        }
    }

    Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .context("Failed to set CPU execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(intra_threads)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))
}

/// Padded `[batch, max_len]` model inputs
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BatchInputs {
    pub input_ids: Array2<i64>,
    pub attention_mask: Array2<i64>,
    /// Present only for graphs that declare a `token_type_ids` input
    pub token_type_ids: Option<Array2<i64>>,
}

impl BatchInputs {
    /// Right-pads every encoding with zeros to the longest one in the batch
    pub(crate) fn from_encodings(
        encodings: &[Encoding],
        uses_token_type_ids: bool,
    ) -> Result<Self> {
        let batch = encodings.len();
        let max_len = encodings
            .iter()
            .map(|enc| enc.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids_batch = Vec::with_capacity(batch * max_len);
        let mut attention_mask_batch = Vec::with_capacity(batch * max_len);
        let mut token_type_ids_batch = Vec::with_capacity(batch * max_len);

        for encoding in encodings {
            let ids = encoding.get_ids();
            let padding_needed = max_len - ids.len();

            input_ids_batch.extend(ids.iter().map(|&id| id as i64));
            attention_mask_batch.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
            token_type_ids_batch.extend(encoding.get_type_ids().iter().map(|&t| t as i64));

            input_ids_batch.extend(std::iter::repeat(0i64).take(padding_needed));
            attention_mask_batch.extend(std::iter::repeat(0i64).take(padding_needed));
            token_type_ids_batch.extend(std::iter::repeat(0i64).take(padding_needed));
        }

        let input_ids = Array2::from_shape_vec((batch, max_len), input_ids_batch)
            .context("Failed to create batch input_ids array")?;
        let attention_mask = Array2::from_shape_vec((batch, max_len), attention_mask_batch)
            .context("Failed to create batch attention_mask array")?;
        let token_type_ids = if uses_token_type_ids {
            Some(
                Array2::from_shape_vec((batch, max_len), token_type_ids_batch)
                    .context("Failed to create batch token_type_ids array")?,
            )
        } else {
            None
        };

        Ok(Self {
            input_ids,
            attention_mask,
            token_type_ids,
        })
    }
}

/// Turns the first model output into one sentence vector per batch row.
///
/// Rank-3 outputs `[batch, seq_len, hidden]` are pooled with the row's
/// attention mask; rank-2 outputs `[batch, hidden]` are already pooled.
pub(crate) fn output_to_embeddings(
    output: ArrayViewD<'_, f32>,
    attention_mask: ArrayView2<'_, i64>,
    pooling: PoolingStrategy,
) -> Result<Vec<Vec<f32>>> {
    let batch = attention_mask.nrows();

    if output.ndim() == 0 || output.shape()[0] != batch {
        bail!(
            "Model output shape {:?} does not match batch size {}",
            output.shape(),
            batch
        );
    }

    match output.ndim() {
        3 => {
            let tokens = output
                .into_dimensionality::<Ix3>()
                .context("Failed to view output as [batch, seq_len, hidden]")?;
            if tokens.shape()[1] != attention_mask.ncols() {
                bail!(
                    "Model output sequence length {} does not match input length {}",
                    tokens.shape()[1],
                    attention_mask.ncols()
                );
            }
            Ok((0..batch)
                .map(|row| {
                    let mask = attention_mask.row(row).to_vec();
                    pooling.pool(tokens.index_axis(Axis(0), row), &mask)
                })
                .collect())
        }
        2 => {
            let pooled = output
                .into_dimensionality::<Ix2>()
                .context("Failed to view output as [batch, hidden]")?;
            Ok(pooled.rows().into_iter().map(|row| row.to_vec()).collect())
        }
        _ => bail!("Model outputs unexpected shape: {:?}", output.shape()),
    }
}

/// Pads `encodings`, runs the session once and pools each row into a
/// sentence vector.
fn run_inference(
    session: &mut Session,
    encodings: &[Encoding],
    pooling: PoolingStrategy,
    uses_token_type_ids: bool,
) -> Result<Vec<Vec<f32>>> {
    let inputs = BatchInputs::from_encodings(encodings, uses_token_type_ids)?;
    let attention_mask = inputs.attention_mask.clone();

    let outputs = match inputs.token_type_ids {
        Some(token_type_ids) => session.run(ort::inputs![
            "input_ids" => Value::from_array(inputs.input_ids)?,
            "attention_mask" => Value::from_array(inputs.attention_mask)?,
            "token_type_ids" => Value::from_array(token_type_ids)?
        ])?,
        None => session.run(ort::inputs![
            "input_ids" => Value::from_array(inputs.input_ids)?,
            "attention_mask" => Value::from_array(inputs.attention_mask)?
        ])?,
    };

    // Output names differ between exports; the first output is the one we want
    let output = outputs[0]
        .try_extract_array::<f32>()
        .context("Failed to extract output tensor")?;

    output_to_embeddings(output, attention_mask.view(), pooling)
}
