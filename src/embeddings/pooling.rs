// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Token-to-sentence pooling
//!
//! Mirrors the sentence-transformers pooling layer. Padding positions (mask 0)
//! never contribute to the result.

use anyhow::{bail, Context, Result};
use ndarray::ArrayView2;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolingStrategy {
    /// Average of the unmasked token embeddings
    #[default]
    Mean,
    /// Sum of the unmasked token embeddings divided by sqrt(token count)
    MeanSqrtLen,
    /// Mean weighted by 1-based token position
    WeightedMean,
    /// Embedding of the first ([CLS]) token
    Cls,
    /// Embedding of the last unmasked token
    LastToken,
    /// Element-wise maximum over the unmasked token embeddings
    Max,
}

const KNOWN_MODES: &[&str] = &[
    "pooling_mode_cls_token",
    "pooling_mode_mean_tokens",
    "pooling_mode_max_tokens",
    "pooling_mode_mean_sqrt_len_tokens",
    "pooling_mode_weightedmean_tokens",
    "pooling_mode_lasttoken",
];

/// `1_Pooling/config.json` as written by sentence-transformers
#[derive(Debug, Default, Deserialize)]
struct PoolingConfigFile {
    #[serde(default)]
    pooling_mode_cls_token: bool,
    #[serde(default)]
    pooling_mode_mean_tokens: bool,
    #[serde(default)]
    pooling_mode_max_tokens: bool,
    #[serde(default)]
    pooling_mode_mean_sqrt_len_tokens: bool,
    #[serde(default)]
    pooling_mode_weightedmean_tokens: bool,
    #[serde(default)]
    pooling_mode_lasttoken: bool,
}

impl PoolingStrategy {
    /// Parses a sentence-transformers pooling config.
    ///
    /// A config with no mode enabled falls back to mean pooling. Combined
    /// modes (concatenated outputs) and enabled modes this crate does not
    /// know are rejected.
    pub fn from_config_json(json: &str) -> Result<Self> {
        let raw: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(json).context("Invalid pooling config")?;
        let unknown: Vec<&str> = raw
            .iter()
            .filter(|(key, value)| {
                key.starts_with("pooling_mode_")
                    && !KNOWN_MODES.contains(&key.as_str())
                    && value.as_bool().unwrap_or(false)
            })
            .map(|(key, _)| key.as_str())
            .collect();
        if !unknown.is_empty() {
            bail!("Unsupported pooling modes: {}", unknown.join(", "));
        }

        let config: PoolingConfigFile =
            serde_json::from_str(json).context("Invalid pooling config")?;

        let enabled: Vec<PoolingStrategy> = [
            (config.pooling_mode_cls_token, PoolingStrategy::Cls),
            (config.pooling_mode_max_tokens, PoolingStrategy::Max),
            (config.pooling_mode_mean_tokens, PoolingStrategy::Mean),
            (
                config.pooling_mode_mean_sqrt_len_tokens,
                PoolingStrategy::MeanSqrtLen,
            ),
            (
                config.pooling_mode_weightedmean_tokens,
                PoolingStrategy::WeightedMean,
            ),
            (config.pooling_mode_lasttoken, PoolingStrategy::LastToken),
        ]
        .into_iter()
        .filter_map(|(on, strategy)| on.then_some(strategy))
        .collect();

        match enabled.as_slice() {
            [] => Ok(PoolingStrategy::Mean),
            [single] => Ok(*single),
            many => bail!("Combined pooling modes are not supported: {:?}", many),
        }
    }

    /// Pools a `[seq_len, hidden_dim]` token matrix into one vector
    pub fn pool(&self, tokens: ArrayView2<'_, f32>, attention_mask: &[i64]) -> Vec<f32> {
        let seq_len = tokens.shape()[0];
        let hidden_dim = tokens.shape()[1];
        let masked = |i: usize| attention_mask.get(i).copied().unwrap_or(0) == 0;

        match self {
            PoolingStrategy::Cls => {
                if seq_len == 0 {
                    vec![0.0; hidden_dim]
                } else {
                    tokens.row(0).to_vec()
                }
            }
            PoolingStrategy::LastToken => match (0..seq_len).rev().find(|&i| !masked(i)) {
                Some(last) => tokens.row(last).to_vec(),
                None => vec![0.0; hidden_dim],
            },
            PoolingStrategy::Max => {
                let mut pooled = vec![f32::NEG_INFINITY; hidden_dim];
                let mut seen = false;
                for i in (0..seq_len).filter(|&i| !masked(i)) {
                    seen = true;
                    for j in 0..hidden_dim {
                        pooled[j] = pooled[j].max(tokens[[i, j]]);
                    }
                }
                if !seen {
                    pooled.fill(0.0);
                }
                pooled
            }
            PoolingStrategy::Mean
            | PoolingStrategy::MeanSqrtLen
            | PoolingStrategy::WeightedMean => {
                let mut pooled = vec![0.0f32; hidden_dim];
                let mut sum_weights = 0.0f32;

                for i in 0..seq_len {
                    let mask_value = attention_mask.get(i).copied().unwrap_or(0) as f32;
                    let weight = match self {
                        PoolingStrategy::WeightedMean => mask_value * (i + 1) as f32,
                        _ => mask_value,
                    };
                    sum_weights += weight;
                    for j in 0..hidden_dim {
                        pooled[j] += tokens[[i, j]] * weight;
                    }
                }

                let divisor = match self {
                    PoolingStrategy::MeanSqrtLen => sum_weights.sqrt(),
                    _ => sum_weights,
                };

                for val in &mut pooled {
                    *val /= divisor.max(1e-9);
                }

                pooled
            }
        }
    }
}
