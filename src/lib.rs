// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod embeddings;

pub use api::{create_app, AppState};
pub use client::{ClientError, EmbeddingClient};
pub use config::{ClientConfig, ServiceConfig};
pub use embeddings::{EmbeddingModel, HashEmbeddingModel, OnnxEmbeddingModel};
