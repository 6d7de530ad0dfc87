// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::api::{EmbedResponse, HealthResponse};
use crate::client::EmbeddingClient;
use crate::config::ClientConfig;

/// Arguments for the doctor command
#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Client config file (TOML); env vars override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Arguments for the embed command
#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Client config file (TOML); env vars override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Texts to embed
    #[arg(required = true)]
    pub texts: Vec<String>,
}

/// Outcome of probing a server with a given client config
#[derive(Debug, Clone, PartialEq)]
pub struct DoctorReport {
    pub health: HealthResponse,
    /// False when the server serves a different model than configured
    pub model_matches: bool,
}

pub async fn doctor(args: DoctorArgs) -> Result<()> {
    dotenv::dotenv().ok();

    let config = load_config(args.config)?;
    println!("{}", config.to_safe_string());

    let report = run_doctor(&config).await?;
    println!(
        "Server at {} is healthy (status={}, model={})",
        config.url, report.health.status, report.health.model
    );

    if !report.model_matches {
        warn!(
            "Server model {} differs from configured model {}",
            report.health.model, config.model
        );
        println!(
            "Warning: server serves {} but the client expects {}",
            report.health.model, config.model
        );
    }

    Ok(())
}

/// Probes `/health`; an unreachable or unhealthy server is an error
pub async fn run_doctor(config: &ClientConfig) -> Result<DoctorReport> {
    let client = EmbeddingClient::from_config(config)?;
    let health = client
        .health()
        .await
        .with_context(|| format!("Embedding server at {} is not reachable", config.url))?;

    Ok(DoctorReport {
        model_matches: health.model == config.model,
        health,
    })
}

pub async fn embed(args: EmbedArgs) -> Result<()> {
    dotenv::dotenv().ok();

    let config = load_config(args.config)?;
    let client = EmbeddingClient::from_config(&config)?;

    info!("Embedding {} texts via {}", args.texts.len(), config.url);
    let embeddings = client.embed(&args.texts).await?;

    let output = serde_json::to_string(&EmbedResponse::from(embeddings))?;
    println!("{}", output);
    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<ClientConfig> {
    ClientConfig::load(path.as_deref()).context("Failed to load client config")
}
