// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! EmbeddingClient tests against a live local server

use crate::common::{
    expected_vector, hash_model, spawn_server, CountingModel, FailingModel, TruncatingModel,
    TEST_MODEL_NAME,
};
use embedding_server::client::{ClientError, EmbeddingClient};
use reqwest::StatusCode;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

fn client_for(addr: SocketAddr, batch_size: usize) -> EmbeddingClient {
    EmbeddingClient::new(
        &format!("http://{}", addr),
        batch_size,
        Duration::from_secs(5),
        Duration::from_secs(2),
    )
    .unwrap()
}

fn texts(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("snippet {}", i)).collect()
}

#[tokio::test]
async fn test_embed_single_batch() {
    let addr = spawn_server(Arc::new(hash_model())).await;
    let client = client_for(addr, 32);

    let inputs = texts(3);
    let embeddings = client.embed(&inputs).await.unwrap();

    assert_eq!(embeddings.len(), 3);
    for (text, vector) in inputs.iter().zip(&embeddings) {
        assert_eq!(vector, &expected_vector(text));
    }
}

#[tokio::test]
async fn test_embed_splits_into_batches_in_order() {
    let model = Arc::new(CountingModel::new());
    let addr = spawn_server(model.clone()).await;
    let client = client_for(addr, 2);

    let inputs = texts(5);
    let embeddings = client.embed(&inputs).await.unwrap();

    assert_eq!(model.batch_sizes(), vec![2, 2, 1]);
    assert_eq!(embeddings.len(), 5);
    for (text, vector) in inputs.iter().zip(&embeddings) {
        assert_eq!(vector, &expected_vector(text));
    }
}

#[tokio::test]
async fn test_embed_empty_makes_no_request() {
    let model = Arc::new(CountingModel::new());
    let addr = spawn_server(model.clone()).await;
    let client = client_for(addr, 4);

    let embeddings = client.embed(&[]).await.unwrap();

    assert!(embeddings.is_empty());
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_server_failure_surfaces_status_and_body() {
    let addr = spawn_server(Arc::new(FailingModel)).await;
    let client = client_for(addr, 4);

    match client.embed(&texts(2)).await {
        Err(ClientError::Server { status, body }) => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert!(body.contains("encoding_failed"));
        }
        other => panic!("expected server error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_short_server_output_is_an_error() {
    let addr = spawn_server(Arc::new(TruncatingModel)).await;
    let client = client_for(addr, 4);

    // The server itself rejects short output, so the client sees a 500
    let err = client.embed(&texts(2)).await.unwrap_err();
    assert!(matches!(err, ClientError::Server { .. }));
}

#[tokio::test]
async fn test_health_returns_model_name() {
    let addr = spawn_server(Arc::new(hash_model())).await;
    let client = client_for(addr, 4);

    let health = client.health().await.unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.model, TEST_MODEL_NAME);
    assert!(client.is_healthy().await);
}

#[tokio::test]
async fn test_unreachable_server() {
    // Bind then drop to get a port with nothing listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(addr, 4);

    assert!(!client.is_healthy().await);
    assert!(matches!(
        client.embed(&texts(1)).await,
        Err(ClientError::Transport { .. })
    ));
}
