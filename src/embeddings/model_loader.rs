// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding Model Loader
//!
//! Turns a model identifier into files on disk and loads the ONNX model.
//! An identifier naming an existing directory is used as-is; anything else
//! is treated as a Hugging Face Hub repo id and fetched into the hub cache.

use super::{EmbeddingModel, OnnxEmbeddingModel, PoolingStrategy};
use crate::config::ServiceConfig;
use anyhow::{anyhow, bail, Context, Result};
use hf_hub::api::tokio::{ApiBuilder, ApiRepo};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// ONNX export locations, in order of preference
const ONNX_CANDIDATES: &[&str] = &["onnx/model.onnx", "model.onnx"];
const TOKENIZER_FILE: &str = "tokenizer.json";
const POOLING_CONFIG_FILE: &str = "1_Pooling/config.json";
const SENTENCE_CONFIG_FILE: &str = "sentence_bert_config.json";
const MODULES_FILE: &str = "modules.json";

/// Pipeline stages reproduced by the ONNX graph plus [`PoolingStrategy`];
/// normalization is applied per request.
const SUPPORTED_MODULES: &[&str] = &[
    "sentence_transformers.models.Transformer",
    "sentence_transformers.models.Pooling",
    "sentence_transformers.models.Normalize",
];

/// Everything needed to construct an [`OnnxEmbeddingModel`]
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFiles {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub pooling: PoolingStrategy,
    /// Truncation length declared by the model, if any
    pub max_seq_length: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct SentenceConfigFile {
    max_seq_length: Option<usize>,
}

/// One entry of `modules.json`
#[derive(Debug, Deserialize)]
struct ModuleEntry {
    #[serde(rename = "type")]
    module_type: String,
}

/// Resolves `identifier` to local model files, downloading them if needed
pub async fn resolve_model_files(identifier: &str, cache_dir: Option<&Path>) -> Result<ModelFiles> {
    let local = Path::new(identifier);
    if local.is_dir() {
        debug!(path = %local.display(), "Using local model directory");
        return files_from_dir(local);
    }

    files_from_hub(identifier, cache_dir).await
}

/// Resolves and loads the model named by `config`.
///
/// Any failure here is fatal for the server; there is nothing to serve
/// without a model.
pub async fn load_model(config: &ServiceConfig) -> Result<OnnxEmbeddingModel> {
    let start = Instant::now();
    info!(model = %config.model_name, "Resolving embedding model");

    let mut files = resolve_model_files(&config.model_name, config.cache_dir.as_deref())
        .await
        .with_context(|| format!("Failed to resolve model {}", config.model_name))?;

    if config.max_seq_length.is_some() {
        files.max_seq_length = config.max_seq_length;
    }

    info!(
        model_path = %files.model_path.display(),
        tokenizer_path = %files.tokenizer_path.display(),
        "Model files resolved"
    );

    let model_name = config.model_name.clone();
    let intra_threads = config.intra_threads;
    let model = tokio::task::spawn_blocking(move || {
        OnnxEmbeddingModel::new(model_name, &files, intra_threads)
    })
    .await
    .context("Model loading task failed")??;

    info!(
        model = %config.model_name,
        dimension = model.dimension(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Embedding model ready"
    );

    Ok(model)
}

fn files_from_dir(dir: &Path) -> Result<ModelFiles> {
    let model_path = ONNX_CANDIDATES
        .iter()
        .map(|candidate| dir.join(candidate))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            anyhow!(
                "No ONNX model found in {} (looked for {})",
                dir.display(),
                ONNX_CANDIDATES.join(", ")
            )
        })?;

    let tokenizer_path = dir.join(TOKENIZER_FILE);
    if !tokenizer_path.is_file() {
        bail!("Tokenizer file not found: {}", tokenizer_path.display());
    }

    let modules_path = dir.join(MODULES_FILE);
    if modules_path.is_file() {
        check_modules(&modules_path)?;
    }

    let pooling_path = dir.join(POOLING_CONFIG_FILE);
    let pooling = if pooling_path.is_file() {
        read_pooling(&pooling_path)?
    } else {
        PoolingStrategy::default()
    };

    let sentence_path = dir.join(SENTENCE_CONFIG_FILE);
    let max_seq_length = if sentence_path.is_file() {
        read_max_seq_length(&sentence_path)?
    } else {
        None
    };

    Ok(ModelFiles {
        model_path,
        tokenizer_path,
        pooling,
        max_seq_length,
    })
}

async fn files_from_hub(repo_id: &str, cache_dir: Option<&Path>) -> Result<ModelFiles> {
    let mut builder = ApiBuilder::new().with_progress(false);
    if let Some(dir) = cache_dir {
        builder = builder.with_cache_dir(dir.to_path_buf());
    }
    let api = builder
        .build()
        .context("Failed to initialize Hugging Face Hub client")?;
    let repo = api.model(repo_id.to_string());

    let mut model_path = None;
    let mut last_error = None;
    for candidate in ONNX_CANDIDATES {
        match repo.get(candidate).await {
            Ok(path) => {
                model_path = Some(path);
                break;
            }
            Err(e) => {
                debug!(repo = repo_id, file = candidate, "ONNX candidate unavailable: {}", e);
                last_error = Some(e);
            }
        }
    }

    let model_path = model_path.ok_or_else(|| {
        anyhow!(
            "Model {} has no ONNX export (looked for {}): {}",
            repo_id,
            ONNX_CANDIDATES.join(", "),
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no candidates".to_string())
        )
    })?;

    let tokenizer_path = repo
        .get(TOKENIZER_FILE)
        .await
        .with_context(|| format!("Failed to fetch {} for {}", TOKENIZER_FILE, repo_id))?;

    if let Some(path) = optional_file(&repo, MODULES_FILE).await {
        check_modules(&path).with_context(|| format!("Model {} is not supported", repo_id))?;
    }

    let pooling = match optional_file(&repo, POOLING_CONFIG_FILE).await {
        Some(path) => read_pooling(&path)?,
        None => PoolingStrategy::default(),
    };

    let max_seq_length = match optional_file(&repo, SENTENCE_CONFIG_FILE).await {
        Some(path) => read_max_seq_length(&path)?,
        None => None,
    };

    Ok(ModelFiles {
        model_path,
        tokenizer_path,
        pooling,
        max_seq_length,
    })
}

async fn optional_file(repo: &ApiRepo, filename: &str) -> Option<PathBuf> {
    match repo.get(filename).await {
        Ok(path) => Some(path),
        Err(e) => {
            debug!(file = filename, "Optional model file unavailable: {}", e);
            None
        }
    }
}

fn read_pooling(path: &Path) -> Result<PoolingStrategy> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    PoolingStrategy::from_config_json(&contents)
        .with_context(|| format!("Invalid pooling config {}", path.display()))
}

/// Fails when the sentence-transformers pipeline has stages (such as a
/// Dense projection) that the ONNX export does not include
fn check_modules(path: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let modules: Vec<ModuleEntry> = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid modules config {}", path.display()))?;

    let unsupported: Vec<&str> = modules
        .iter()
        .map(|module| module.module_type.as_str())
        .filter(|module_type| !SUPPORTED_MODULES.contains(module_type))
        .collect();

    if !unsupported.is_empty() {
        bail!(
            "Unsupported sentence-transformers modules in {}: {}",
            path.display(),
            unsupported.join(", ")
        );
    }
    Ok(())
}

fn read_max_seq_length(path: &Path) -> Result<Option<usize>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: SentenceConfigFile = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid sentence config {}", path.display()))?;
    Ok(config.max_seq_length.filter(|&len| len > 0))
}
