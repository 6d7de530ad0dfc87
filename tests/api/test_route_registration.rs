// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Route registration tests: only /health and /embed are served

use crate::common::hash_model;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
};
use embedding_server::api::{create_app, AppState, ErrorResponse};
use std::sync::Arc;
use tower::util::ServiceExt;

fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_embed_route_rejects_get() {
    let app = create_app(AppState::new(Arc::new(hash_model())));

    let response = app.oneshot(request(Method::GET, "/embed")).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_health_route_rejects_post() {
    let app = create_app(AppState::new(Arc::new(hash_model())));

    let response = app.oneshot(request(Method::POST, "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_route_is_structured_not_found() {
    let app = create_app(AppState::new(Arc::new(hash_model())));

    let response = app
        .oneshot(request(Method::POST, "/v1/embed"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error.error_type, "not_found");
    assert!(error.message.contains("/v1/embed"));
}

#[tokio::test]
async fn test_large_body_accepted() {
    let app = create_app(AppState::new(Arc::new(hash_model())));
    // Well above axum's 2 MB default body limit
    let inputs: Vec<String> = (0..600).map(|i| format!("{:04}{}", i, "x".repeat(4096))).collect();
    let body = serde_json::json!({ "inputs": inputs }).to_string();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/embed")
        .body(Body::from(body))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
