// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! GET /health tests

use crate::common::{hash_model, TEST_MODEL_NAME};
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
};
use embedding_server::api::{create_app, AppState, HealthResponse};
use std::sync::Arc;
use tower::util::ServiceExt;

fn health_request() -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_ok_and_model() {
    let app = create_app(AppState::new(Arc::new(hash_model())));

    let response = app.oneshot(health_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let health: HealthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.model, TEST_MODEL_NAME);
}

#[tokio::test]
async fn test_health_exact_shape() {
    let app = create_app(AppState::new(Arc::new(hash_model())));

    let response = app.oneshot(health_request()).await.unwrap();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(
        json,
        serde_json::json!({"status": "ok", "model": TEST_MODEL_NAME})
    );
}

#[tokio::test]
async fn test_health_is_repeatable() {
    let app = create_app(AppState::new(Arc::new(hash_model())));

    for _ in 0..3 {
        let response = app.clone().oneshot(health_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
