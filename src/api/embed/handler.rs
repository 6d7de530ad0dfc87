// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /embed HTTP handler

use crate::api::embed::{EmbedRequest, EmbedResponse};
use crate::api::{ApiError, AppState};
use axum::{body::Bytes, extract::State, Json};
use std::time::Instant;
use tracing::{debug, error};

/// POST /embed handler
///
/// # Request Body
/// ```json
/// { "inputs": ["text1", "text2"] }
/// ```
///
/// # Response Body
/// ```json
/// { "embeddings": [[0.1, 0.2, ...], [0.3, 0.4, ...]] }
/// ```
///
/// The body is taken as raw bytes and validated by
/// [`EmbedRequest::from_json_bytes`], so malformed requests never reach
/// the model. An empty `inputs` list is answered without invoking it.
///
/// # Errors
/// - 400 if the body is not JSON
/// - 422 if the body does not match the request schema
/// - 500 if the model fails on the batch
pub async fn embed_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<EmbedResponse>, ApiError> {
    let request = EmbedRequest::from_json_bytes(&body)?;

    if request.inputs.is_empty() {
        debug!("Empty embed request, skipping model");
        return Ok(Json(EmbedResponse::empty()));
    }

    let start = Instant::now();
    let count = request.inputs.len();

    let embeddings = state
        .model
        .encode(&request.inputs, true)
        .await
        .map_err(|e| {
            error!(count, "Embedding failed: {:#}", e);
            ApiError::EncodingFailed(format!("{:#}", e))
        })?;

    if embeddings.len() != count {
        return Err(ApiError::EncodingFailed(format!(
            "model returned {} embeddings for {} inputs",
            embeddings.len(),
            count
        )));
    }

    debug!(
        count,
        model = state.model.model_name(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Embedded batch"
    );

    Ok(Json(embeddings.into()))
}
