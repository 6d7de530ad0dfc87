// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /embed success-path tests

use crate::common::{expected_vector, hash_model, l2_norm, CountingModel, TEST_DIMENSION};
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use embedding_server::api::{create_app, AppState, EmbedResponse};
use std::sync::Arc;
use tower::util::ServiceExt;

fn embed_request(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/embed")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn post_embed(app: Router, body: &str) -> (StatusCode, EmbedResponse) {
    let response = app.oneshot(embed_request(body)).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_embed_returns_one_vector_per_input() {
    let app = create_app(AppState::new(Arc::new(hash_model())));

    let (status, response) =
        post_embed(app, r#"{"inputs": ["fn main() {}", "read a file", "x"]}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response.embeddings.len(), 3);
    for vector in &response.embeddings {
        assert_eq!(vector.len(), TEST_DIMENSION);
    }
}

#[tokio::test]
async fn test_embed_vectors_are_normalized() {
    let app = create_app(AppState::new(Arc::new(hash_model())));

    let (_, response) = post_embed(app, r#"{"inputs": ["alpha", "beta"]}"#).await;

    for vector in &response.embeddings {
        assert!((l2_norm(vector) - 1.0).abs() < 1e-3);
    }
}

#[tokio::test]
async fn test_embed_preserves_input_order() {
    let app = create_app(AppState::new(Arc::new(hash_model())));
    let inputs = ["third", "first", "second"];

    let (_, response) =
        post_embed(app, &serde_json::json!({ "inputs": inputs }).to_string()).await;

    for (text, vector) in inputs.iter().zip(&response.embeddings) {
        assert_eq!(vector, &expected_vector(text));
    }
}

#[tokio::test]
async fn test_duplicate_inputs_get_identical_vectors() {
    let app = create_app(AppState::new(Arc::new(hash_model())));

    let (_, response) = post_embed(app, r#"{"inputs": ["same", "same"]}"#).await;

    assert_eq!(response.embeddings[0], response.embeddings[1]);
}

#[tokio::test]
async fn test_empty_inputs_skip_the_model() {
    let model = Arc::new(CountingModel::new());
    let app = create_app(AppState::new(model.clone()));

    let response = app.oneshot(embed_request(r#"{"inputs": []}"#)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], br#"{"embeddings":[]}"#);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_whole_batch_encoded_in_one_call() {
    let model = Arc::new(CountingModel::new());
    let app = create_app(AppState::new(model.clone()));

    let (status, _) = post_embed(app, r#"{"inputs": ["a", "b", "c", "d"]}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(model.batch_sizes(), vec![4]);
}

#[tokio::test]
async fn test_empty_string_input_is_embedded() {
    let app = create_app(AppState::new(Arc::new(hash_model())));

    let (status, response) = post_embed(app, r#"{"inputs": [""]}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response.embeddings.len(), 1);
}

#[tokio::test]
async fn test_content_type_not_required() {
    let app = create_app(AppState::new(Arc::new(hash_model())));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/embed")
        .body(Body::from(r#"{"inputs": ["plain body"]}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
