// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Configuration for the embedding server and its clients
//!
//! Loaders read settings through a `Fn(&str) -> Option<String>` lookup;
//! only `from_env`/`load` bind it to the process environment.

pub mod client;
pub mod service;

pub use client::ClientConfig;
pub use service::ServiceConfig;

use std::path::PathBuf;
use thiserror::Error;

/// Model loaded when `EMBEDDING_MODEL_NAME` is not set
pub const DEFAULT_MODEL_NAME: &str = "sentence-transformers/code-bert-tiny-code-search";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key}: {value} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Config path is not a file: {0}")]
    NotAFile(PathBuf),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Returns the value for `key` unless it is missing or blank
pub(crate) fn non_blank<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.trim().is_empty())
}

/// Parses a strictly positive integer setting
pub(crate) fn parse_positive<F>(lookup: &F, key: &str) -> Result<Option<usize>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = non_blank(lookup, key) else {
        return Ok(None);
    };

    match raw.trim().parse::<usize>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
            reason: "must be greater than 0".to_string(),
        }),
        Ok(value) => Ok(Some(value)),
        Err(e) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
pub(crate) fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: std::collections::HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}
