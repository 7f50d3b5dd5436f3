//! Configuration module for codegraph.
//!
//! Handles loading, validating, and providing default configuration values.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ── Default value functions ──────────────────────────────────────────

fn default_db_path() -> String {
    "./codegraph.db".to_string()
}

fn default_collection() -> String {
    "chunks".to_string()
}

fn default_max_file_size() -> u64 {
    crate::scanner::DEFAULT_MAX_FILE_SIZE
}

fn default_vector_batch_size() -> usize {
    100
}

fn default_advisor_url() -> String {
    "http://localhost:8811/advise".to_string()
}

fn default_advisor_timeout_ms() -> u64 {
    5000
}

fn default_embedding_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_dimensions() -> usize {
    768
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    #[serde(default = "default_vector_batch_size")]
    pub vector_batch_size: usize,

    #[serde(default)]
    pub advisor: AdvisorConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AdvisorConfig {
    /// When false the chunker goes straight to fixed-size chunking.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_advisor_url")]
    pub url: String,

    #[serde(default = "default_advisor_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            collection: default_collection(),
            max_file_size: default_max_file_size(),
            vector_batch_size: default_vector_batch_size(),
            advisor: AdvisorConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_advisor_url(),
            timeout_ms: default_advisor_timeout_ms(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `"codegraph.json"`.
    /// If the file does not exist, returns a default config and optionally
    /// generates a template file.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            "codegraph.json"
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            // Generate template only for the default path
            if path == "codegraph.json" {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        // Parse with defaults; an unparseable file must not block indexing
        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.max_file_size > 0, "max_file_size must be positive");
        anyhow::ensure!(
            self.vector_batch_size > 0,
            "vector_batch_size must be positive"
        );
        anyhow::ensure!(
            self.embedding.dimensions > 0,
            "embedding.dimensions must be positive"
        );
        anyhow::ensure!(!self.collection.is_empty(), "collection must not be empty");
        anyhow::ensure!(
            self.advisor.timeout_ms > 0,
            "advisor.timeout_ms must be positive"
        );
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────
