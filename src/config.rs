//! TOML configuration for the `lex` binary and server.
//!
//! Every key has a default, so an absent or empty file yields a working
//! configuration with embeddings disabled.
//! [`Config::index_config`] projects the relevant keys onto the core
//! [`IndexConfig`].
//!
//! ```toml
//! [chunking]
//! size = 1000
//! overlap = 200
//!
//! [retrieval]
//! relevance_threshold = 0.3
//! default_k = 4
//!
//! [embedding]
//! provider = "gemini"          # disabled | openai | gemini | hash
//! model = "text-embedding-004"
//! max_retries = 3
//! initial_backoff_ms = 1000
//! timeout_secs = 30
//! concurrency = 1
//! min_request_interval_ms = 200
//!
//! [index]
//! reingest = "replace"         # replace | append
//! default_doc_type = "MEMO"    # for loaded files whose directory names no type
//!
//! [server]
//! bind = "127.0.0.1:7340"
//! ```

use anyhow::{Context, Result};
use lexindex_core::{DocType, Index, IndexConfig, ReingestPolicy};
use serde::Deserialize;
use std::path::Path;

use crate::embedding::create_embedder;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexSection,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: default_chunk_size(),
            overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f32,
    #[serde(default = "default_k")]
    pub default_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: default_relevance_threshold(),
            default_k: default_k(),
        }
    }
}

fn default_relevance_threshold() -> f32 {
    0.3
}
fn default_k() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Vector length for the `hash` provider.
    #[serde(default)]
    pub dims: Option<usize>,
    /// Override the provider's API root (e.g. a proxy or a test server).
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            base_url: None,
            api_key_env: None,
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            min_request_interval_ms: default_min_request_interval_ms(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    1000
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_concurrency() -> usize {
    1
}
fn default_min_request_interval_ms() -> u64 {
    200
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexSection {
    #[serde(default)]
    pub reingest: ReingestPolicy,
    #[serde(default = "default_doc_type")]
    pub default_doc_type: DocType,
}

impl Default for IndexSection {
    fn default() -> Self {
        Self {
            reingest: ReingestPolicy::default(),
            default_doc_type: default_doc_type(),
        }
    }
}

fn default_doc_type() -> DocType {
    DocType::Memo
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

impl Config {
    /// Core index parameters derived from this configuration.
    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            chunk_size: self.chunking.size,
            chunk_overlap: self.chunking.overlap,
            relevance_threshold: self.retrieval.relevance_threshold,
            max_retries: self.embedding.max_retries,
            initial_backoff_ms: self.embedding.initial_backoff_ms,
            embed_timeout_secs: self.embedding.timeout_secs,
            concurrency: self.embedding.concurrency,
            min_request_interval_ms: self.embedding.min_request_interval_ms,
            reingest: self.index.reingest,
        }
    }

    /// Type assigned to loaded files whose path names no type.
    pub fn default_doc_type(&self) -> DocType {
        self.index.default_doc_type
    }

    /// Build an empty index wired to the configured embedding provider.
    pub fn build_index(&self) -> Result<Index> {
        let embedder = create_embedder(&self.embedding)?;
        Index::new(self.index_config(), embedder).context("Failed to build index")
    }

    fn validate(&self) -> Result<()> {
        self.index_config()
            .validate()
            .context("Invalid [chunking]/[retrieval]/[embedding] settings")?;

        if self.retrieval.default_k < 1 {
            anyhow::bail!("retrieval.default_k must be >= 1");
        }

        match self.embedding.provider.as_str() {
            "disabled" | "openai" | "gemini" => {}
            "hash" => {
                if self.embedding.dims == Some(0) {
                    anyhow::bail!("embedding.dims must be > 0 when provider is 'hash'");
                }
            }
            other => anyhow::bail!(
                "Unknown embedding provider: '{}'. Must be disabled, openai, gemini, or hash.",
                other
            ),
        }
        Ok(())
    }
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Like [`load_config`], but falls back to defaults when `path` does not exist.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tracing_test::traced_test;

    #[test]
    fn test_empty_file_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.chunking.size, 1000);
        assert_eq!(cfg.chunking.overlap, 200);
        assert_eq!(cfg.retrieval.relevance_threshold, 0.3);
        assert_eq!(cfg.retrieval.default_k, 4);
        assert_eq!(cfg.embedding.provider, "disabled");
        assert_eq!(cfg.embedding.max_retries, 3);
        assert_eq!(cfg.embedding.initial_backoff_ms, 1000);
        assert_eq!(cfg.index.reingest, ReingestPolicy::Replace);
        assert_eq!(cfg.default_doc_type(), DocType::Memo);
        assert_eq!(cfg.server.bind, "127.0.0.1:7340");
        assert!(!cfg.embedding.is_enabled());
    }

    #[test]
    fn test_full_file() {
        let cfg = parse_config(
            r#"
[chunking]
size = 500
overlap = 50

[retrieval]
relevance_threshold = 0.5
default_k = 8

[embedding]
provider = "hash"
dims = 64
concurrency = 4
min_request_interval_ms = 0

[index]
reingest = "append"
default_doc_type = "CASE_LAW"
"#,
        )
        .unwrap();
        let index = cfg.index_config();
        assert_eq!(index.chunk_size, 500);
        assert_eq!(index.chunk_overlap, 50);
        assert_eq!(index.relevance_threshold, 0.5);
        assert_eq!(index.concurrency, 4);
        assert_eq!(index.min_request_interval_ms, 0);
        assert_eq!(index.reingest, ReingestPolicy::Append);
        assert_eq!(cfg.embedding.dims, Some(64));
        assert_eq!(cfg.default_doc_type(), DocType::CaseLaw);
        assert_eq!(cfg.build_index().unwrap().model_name(), "hash-64");
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        let err = parse_config("[chunking]\nsize = 100\noverlap = 100\n").unwrap_err();
        assert!(format!("{:#}", err).contains("overlap"));
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let err = parse_config("[embedding]\nprovider = \"cohere\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_rejects_unknown_reingest_policy() {
        assert!(parse_config("[index]\nreingest = \"merge\"\n").is_err());
    }

    #[test]
    #[traced_test]
    fn test_missing_file_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_or_default(&dir.path().join("lex.toml")).unwrap();
        assert_eq!(cfg.embedding.provider, "disabled");
        assert!(logs_contain("config file not found, using defaults"));
    }

    #[test]
    fn test_load_from_file_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lex.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "[server]\nbind = \"0.0.0.0:9000\"").unwrap();

        assert_eq!(load_config(&path).unwrap().server.bind, "0.0.0.0:9000");

        let missing = dir.path().join("nope.toml");
        assert!(load_config(&missing).is_err());
        assert_eq!(
            load_config_or_default(&missing).unwrap().server.bind,
            "127.0.0.1:7340"
        );
    }
}
