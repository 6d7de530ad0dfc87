// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Deterministic hash-based embedding model
//!
//! Produces pseudo-random vectors seeded from the text hash. Identical text
//! always yields identical vectors, which is all the HTTP layer and client
//! tests need.

use super::{l2_normalize, EmbeddingModel};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub struct HashEmbeddingModel {
    model_name: String,
    dimension: usize,
}

impl HashEmbeddingModel {
    pub fn new(model_name: impl Into<String>, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(anyhow!("Embedding dimension must be greater than 0"));
        }

        Ok(Self {
            model_name: model_name.into(),
            dimension,
        })
    }

    /// Embeds a single text without normalization
    pub fn generate(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();

        let mut embedding = Vec::with_capacity(self.dimension);

        // Linear congruential generator keyed by the text hash
        let mut current_seed = seed;
        for i in 0..self.dimension {
            current_seed =
                (current_seed.wrapping_mul(1664525).wrapping_add(1013904223)) ^ (i as u64);

            // Map to [-1, 1]
            let value = (current_seed as f64 / u64::MAX as f64) * 2.0 - 1.0;
            embedding.push(value as f32);
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingModel for HashEmbeddingModel {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, texts: &[String], normalize: bool) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut embedding = self.generate(text);
                if normalize {
                    l2_normalize(&mut embedding);
                }
                embedding
            })
            .collect())
    }
}
