// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Client-side configuration: TOML file merged over defaults, then env overrides

use super::{non_blank, parse_positive, ConfigError, DEFAULT_MODEL_NAME};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const ENV_SERVER_URL: &str = "EMBEDDING_SERVER_URL";
pub const ENV_MODEL_NAME: &str = "EMBEDDING_MODEL_NAME";
pub const ENV_BATCH_SIZE: &str = "EMBEDDING_CLIENT_BATCH_SIZE";

const DEFAULT_SERVER_URL: &str = "http://localhost:8088";
const DEFAULT_BATCH_SIZE: usize = 32;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 5;

/// Settings used by [`crate::client::EmbeddingClient`] and the CLI
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the embedding server
    pub url: String,
    /// Model the caller expects the server to serve
    pub model: String,
    /// Maximum number of inputs per `/embed` request
    pub batch_size: usize,
    pub timeout_secs: u64,
    pub health_timeout_secs: u64,
}

/// On-disk shape; every field is optional and only overrides when present
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClientConfigFile {
    url: Option<String>,
    model: Option<String>,
    batch_size: Option<usize>,
    timeout_secs: Option<u64>,
    health_timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            model: DEFAULT_MODEL_NAME.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            health_timeout_secs: DEFAULT_HEALTH_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Loads the config from an optional file plus the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = path {
            config.apply_file(read_file(path)?, path)?;
        }

        config.apply_env(&lookup)?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    /// Renders the effective config for diagnostics output
    pub fn to_safe_string(&self) -> String {
        format!(
            "ClientConfig{{url={}, model={}, batch_size={}, timeout={}s, health_timeout={}s}}",
            self.url, self.model, self.batch_size, self.timeout_secs, self.health_timeout_secs
        )
    }

    fn apply_file(&mut self, file: ClientConfigFile, path: &Path) -> Result<(), ConfigError> {
        if let Some(url) = file.url.filter(|u| !u.trim().is_empty()) {
            self.url = url;
        }
        if let Some(model) = file.model.filter(|m| !m.trim().is_empty()) {
            self.model = model;
        }
        if let Some(batch_size) = file.batch_size {
            if batch_size == 0 {
                return Err(ConfigError::InvalidValue {
                    key: format!("batch_size in {}", path.display()),
                    value: "0".to_string(),
                    reason: "must be greater than 0".to_string(),
                });
            }
            self.batch_size = batch_size;
        }
        if let Some(timeout) = file.timeout_secs {
            self.timeout_secs = timeout;
        }
        if let Some(timeout) = file.health_timeout_secs {
            self.health_timeout_secs = timeout;
        }
        Ok(())
    }

    fn apply_env<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = non_blank(lookup, ENV_SERVER_URL) {
            self.url = url;
        }
        if let Some(model) = non_blank(lookup, ENV_MODEL_NAME) {
            self.model = model;
        }
        if let Some(batch_size) = parse_positive(lookup, ENV_BATCH_SIZE)? {
            self.batch_size = batch_size;
        }
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<ClientConfigFile, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(ConfigError::NotAFile(path.to_path_buf()));
    }

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
