// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP client for the embedding server

use crate::api::{EmbedRequest, EmbedResponse, HealthResponse};
use crate::config::ClientConfig;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("batch size must be greater than zero")]
    InvalidBatchSize,

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("server returned {status}: {body}")]
    Server { status: StatusCode, body: String },

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("server returned {actual} embeddings for {expected} inputs")]
    SizeMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Client for a running embedding server
///
/// Large input lists are split into requests of at most `batch_size`
/// texts; the returned vectors keep the input order.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    client: Client,
    base_url: Url,
    batch_size: usize,
    health_timeout: Duration,
}

impl EmbeddingClient {
    pub fn new(
        base_url: &str,
        batch_size: usize,
        timeout: Duration,
        health_timeout: Duration,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(ClientError::InvalidBatchSize);
        }

        let base_url = parse_base_url(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport {
                url: base_url.to_string(),
                source: e,
            })?;

        info!(
            "Embedding client configured: url={}, batch_size={}",
            base_url, batch_size
        );

        Ok(Self {
            client,
            base_url,
            batch_size,
            health_timeout,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(
            &config.url,
            config.batch_size,
            config.timeout(),
            config.health_timeout(),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Embeds `inputs`, one request per chunk of `batch_size` texts
    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.endpoint("embed")?;
        let mut embeddings = Vec::with_capacity(inputs.len());

        for chunk in inputs.chunks(self.batch_size) {
            debug!("Embedding POST {} ({} inputs)", url, chunk.len());
            let request = EmbedRequest::new(chunk.to_vec());

            let response = self
                .client
                .post(url.clone())
                .json(&request)
                .send()
                .await
                .map_err(|e| transport(&url, e))?;

            let status = response.status();
            if status != StatusCode::OK {
                let body = response.text().await.unwrap_or_default();
                return Err(ClientError::Server { status, body });
            }

            let body: EmbedResponse = response
                .json()
                .await
                .map_err(|e| ClientError::Decode(e.to_string()))?;

            if body.embeddings.len() != chunk.len() {
                return Err(ClientError::SizeMismatch {
                    expected: chunk.len(),
                    actual: body.embeddings.len(),
                });
            }

            embeddings.extend(body.embeddings);
        }

        Ok(embeddings)
    }

    /// Fetches `/health`, bounded by the health timeout
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.endpoint("health")?;

        let response = self
            .client
            .get(url.clone())
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|e| transport(&url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Server { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub async fn is_healthy(&self) -> bool {
        match self.health().await {
            Ok(_) => true,
            Err(e) => {
                debug!("Embedding server health check failed: {}", e);
                false
            }
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl {
                url: format!("{}{}", self.base_url, path),
                reason: e.to_string(),
            })
    }
}

fn transport(url: &Url, source: reqwest::Error) -> ClientError {
    ClientError::Transport {
        url: url.to_string(),
        source,
    }
}

/// Parses the base URL, forcing a trailing slash so joins stay under it
fn parse_base_url(raw: &str) -> Result<Url> {
    let invalid = |reason: String| ClientError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("not a base URL".to_string()));
    }
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
