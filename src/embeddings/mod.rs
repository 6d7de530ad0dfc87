// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Text embedding models
//!
//! The server only talks to [`EmbeddingModel`]; the ONNX-backed model is the
//! production implementation and [`HashEmbeddingModel`] is a deterministic
//! stand-in for tests and offline runs.

pub mod hashed;
pub mod model_loader;
pub mod onnx_model;
pub mod pooling;

pub use hashed::HashEmbeddingModel;
pub use model_loader::{load_model, resolve_model_files, ModelFiles};
pub use onnx_model::OnnxEmbeddingModel;
pub use pooling::PoolingStrategy;

use anyhow::Result;
use async_trait::async_trait;

/// A loaded text embedding model
///
/// Implementations are immutable once constructed and shared across
/// concurrent requests.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Identifier the model was loaded from
    fn model_name(&self) -> &str;

    /// Length of every vector this model produces
    fn dimension(&self) -> usize;

    /// Encodes a batch of texts, returning one vector per text in input order.
    ///
    /// When `normalize` is set every vector has unit Euclidean norm.
    async fn encode(&self, texts: &[String], normalize: bool) -> Result<Vec<Vec<f32>>>;
}

/// Scales `vector` in place to unit Euclidean norm. Zero vectors are left as-is.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
