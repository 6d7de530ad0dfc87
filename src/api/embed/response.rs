// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! EmbedResponse type for POST /embed

use serde::{Deserialize, Serialize};

/// Response body for POST /embed
///
/// `embeddings[i]` is the vector for `inputs[i]` of the request.
///
/// # Example
/// ```json
/// {
///   "embeddings": [[0.12, -0.03, ...], [0.08, 0.41, ...]]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub embeddings: Vec<Vec<f32>>,
}

impl EmbedResponse {
    pub fn empty() -> Self {
        Self {
            embeddings: Vec::new(),
        }
    }

    pub fn embedding_count(&self) -> usize {
        self.embeddings.len()
    }
}

impl From<Vec<Vec<f32>>> for EmbedResponse {
    fn from(embeddings: Vec<Vec<f32>>) -> Self {
        Self { embeddings }
    }
}
