// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// tests/common/mod.rs - Test models and helpers shared by the integration suites
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use embedding_server::{
    api::{create_app, AppState},
    embeddings::{EmbeddingModel, HashEmbeddingModel},
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

pub const TEST_MODEL_NAME: &str = "test/hash-embedder";
pub const TEST_DIMENSION: usize = 16;

pub fn hash_model() -> HashEmbeddingModel {
    HashEmbeddingModel::new(TEST_MODEL_NAME, TEST_DIMENSION).unwrap()
}

/// Hash model that records how often and with how many texts it was called
pub struct CountingModel {
    inner: HashEmbeddingModel,
    calls: AtomicUsize,
    batch_sizes: std::sync::Mutex<Vec<usize>>,
}

impl CountingModel {
    pub fn new() -> Self {
        Self {
            inner: hash_model(),
            calls: AtomicUsize::new(0),
            batch_sizes: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingModel for CountingModel {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn encode(&self, texts: &[String], normalize: bool) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes.lock().unwrap().push(texts.len());
        self.inner.encode(texts, normalize).await
    }
}

/// Model whose every encode call fails
pub struct FailingModel;

#[async_trait]
impl EmbeddingModel for FailingModel {
    fn model_name(&self) -> &str {
        TEST_MODEL_NAME
    }

    fn dimension(&self) -> usize {
        TEST_DIMENSION
    }

    async fn encode(&self, _texts: &[String], _normalize: bool) -> Result<Vec<Vec<f32>>> {
        Err(anyhow!("inference session crashed"))
    }
}

/// Model that drops the last vector of every batch
pub struct TruncatingModel;

#[async_trait]
impl EmbeddingModel for TruncatingModel {
    fn model_name(&self) -> &str {
        TEST_MODEL_NAME
    }

    fn dimension(&self) -> usize {
        TEST_DIMENSION
    }

    async fn encode(&self, texts: &[String], normalize: bool) -> Result<Vec<Vec<f32>>> {
        let mut vectors = hash_model().encode(texts, normalize).await?;
        vectors.pop();
        Ok(vectors)
    }
}

/// Expected normalized vector for `text` under the test model
pub fn expected_vector(text: &str) -> Vec<f32> {
    let mut vector = hash_model().generate(text);
    embedding_server::embeddings::l2_normalize(&mut vector);
    vector
}

pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Serves `model` on an ephemeral local port for the life of the test
pub async fn spawn_server(model: Arc<dyn EmbeddingModel>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_app(AppState::new(model));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}
