use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::embeddings::OpenAIEmbedder;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    /// Optional: without it the store is usable for vector-less and
    /// precomputed-embedding queries only.
    #[serde(default)]
    pub embeddings: Option<EmbeddingsConfig>,
    #[serde(default)]
    pub traversal: TraversalConfig,
}

/// Store-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    /// Embedding dimension D, fixed per deployment.
    pub dimensions: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Embedding client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
    /// OpenAI-compatible endpoint override (e.g. a local server).
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Traversal tuning configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TraversalConfig {
    /// Per-hop frontier-size cap; absent means uncapped.
    #[serde(default)]
    pub max_frontier: Option<usize>,
    #[serde(default = "default_k")]
    pub default_k: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_frontier: None,
            default_k: default_k(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_k() -> usize {
    5
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in VECGRAPH_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional; ignore errors
        let _ = dotenv::dotenv();

        let config_path = std::env::var("VECGRAPH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .context("Failed to parse config.toml")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.store.dimensions == 0 {
            anyhow::bail!("store.dimensions must be greater than 0");
        }

        if self.traversal.default_k == 0 {
            anyhow::bail!("traversal.default_k must be greater than 0");
        }

        if let Some(cap) = self.traversal.max_frontier {
            if cap == 0 {
                anyhow::bail!("traversal.max_frontier must be greater than 0 when set");
            }
        }

        // The key itself is checked here so a misconfigured deployment
        // fails at startup, not on the first text query.
        if let Some(embeddings) = &self.embeddings {
            std::env::var(&embeddings.api_key_env).with_context(|| {
                format!(
                    "Environment variable {} not set. Set it in your .env file or as an environment variable.",
                    embeddings.api_key_env
                )
            })?;
        }

        Ok(())
    }

    /// Build the embedding client described by the `[embeddings]` section.
    pub fn build_embedder(&self) -> Result<OpenAIEmbedder> {
        let embeddings = self
            .embeddings
            .as_ref()
            .context("no [embeddings] section configured")?;

        let api_key = std::env::var(&embeddings.api_key_env).with_context(|| {
            format!("Environment variable {} not set", embeddings.api_key_env)
        })?;

        let embedder = OpenAIEmbedder::new(
            api_key,
            embeddings.model.clone(),
            self.store.dimensions,
            Duration::from_secs(embeddings.timeout_secs),
        )?;

        Ok(match &embeddings.endpoint {
            Some(endpoint) => embedder.with_endpoint(endpoint.clone()),
            None => embedder,
        })
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.store.db_path
    }

    /// Embedding dimension D for this deployment
    pub fn dimensions(&self) -> usize {
        self.store.dimensions
    }
}
