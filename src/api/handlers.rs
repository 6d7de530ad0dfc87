// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
}

/// GET /health
///
/// The model is loaded before the listener binds, so a reachable server is
/// always ready to embed.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.model.model_name().to_string(),
    })
}
