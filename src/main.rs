// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use embedding_server::{
    api::{start_server, AppState},
    config::ServiceConfig,
    embeddings::load_model,
};
use std::{env, sync::Arc};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    info!("Starting embedding server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServiceConfig::from_env().context("Invalid service configuration")?;
    info!(
        model = %config.model_name,
        addr = %config.listen_addr,
        intra_threads = config.intra_threads,
        "Service configuration loaded"
    );

    // No model means nothing to serve; fail before binding the port
    let model = load_model(&config)
        .await
        .context("Failed to load embedding model")?;

    let state = AppState::new(Arc::new(model));
    start_server(config.listen_addr, state).await
}
