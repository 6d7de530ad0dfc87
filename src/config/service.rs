// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Server-side configuration, read once at startup

use super::{non_blank, parse_positive, ConfigError, DEFAULT_MODEL_NAME};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const ENV_MODEL_NAME: &str = "EMBEDDING_MODEL_NAME";
pub const ENV_SERVER_ADDR: &str = "EMBEDDING_SERVER_ADDR";
pub const ENV_CACHE_DIR: &str = "EMBEDDING_CACHE_DIR";
pub const ENV_INTRA_THREADS: &str = "EMBEDDING_INTRA_THREADS";
pub const ENV_MAX_SEQ_LENGTH: &str = "EMBEDDING_MAX_SEQ_LENGTH";

const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8088";
const DEFAULT_INTRA_THREADS: usize = 4;

/// Configuration for the embedding server process
///
/// Built by [`ServiceConfig::from_env`] before the model is loaded and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Hugging Face repo id or local directory of the model
    pub model_name: String,
    /// Address the HTTP server binds to
    pub listen_addr: SocketAddr,
    /// Overrides the Hugging Face cache location
    pub cache_dir: Option<PathBuf>,
    /// ONNX Runtime intra-op thread count
    pub intra_threads: usize,
    /// Overrides the tokenizer truncation length from the model config
    pub max_seq_length: Option<usize>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            listen_addr: DEFAULT_SERVER_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8088))),
            cache_dir: None,
            intra_threads: DEFAULT_INTRA_THREADS,
            max_seq_length: None,
        }
    }
}

impl ServiceConfig {
    /// Reads the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(model_name) = non_blank(&lookup, ENV_MODEL_NAME) {
            config.model_name = model_name.trim().to_string();
        }

        if let Some(addr) = non_blank(&lookup, ENV_SERVER_ADDR) {
            config.listen_addr = addr.trim().parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::InvalidValue {
                    key: ENV_SERVER_ADDR.to_string(),
                    value: addr.clone(),
                    reason: e.to_string(),
                }
            })?;
        }

        config.cache_dir = non_blank(&lookup, ENV_CACHE_DIR).map(PathBuf::from);

        if let Some(threads) = parse_positive(&lookup, ENV_INTRA_THREADS)? {
            config.intra_threads = threads;
        }

        config.max_seq_length = parse_positive(&lookup, ENV_MAX_SEQ_LENGTH)?;

        Ok(config)
    }
}
