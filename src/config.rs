use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub blob: BlobConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub app: AppConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BlobConfig {
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            min_chunk_chars: default_min_chunk_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

fn default_max_chunk_chars() -> usize {
    1000
}
fn default_min_chunk_chars() -> usize {
    50
}
fn default_overlap_chars() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_chunks")]
    pub top_chunks: usize,
    #[serde(default = "default_fallback_top_chunks")]
    pub fallback_top_chunks: usize,
    /// Minimum chunk score for the primary context path.
    #[serde(default = "default_context_floor")]
    pub context_floor: f64,
    /// Minimum score for the fallback path and for source attribution.
    #[serde(default = "default_source_floor")]
    pub source_floor: f64,
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_chunks: default_top_chunks(),
            fallback_top_chunks: default_fallback_top_chunks(),
            context_floor: default_context_floor(),
            source_floor: default_source_floor(),
            max_context_chars: default_max_context_chars(),
            max_sources: default_max_sources(),
        }
    }
}

fn default_top_chunks() -> usize {
    3
}
fn default_fallback_top_chunks() -> usize {
    8
}
fn default_context_floor() -> f64 {
    0.2
}
fn default_source_floor() -> f64 {
    0.1
}
fn default_max_context_chars() -> usize {
    12000
}
fn default_max_sources() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Base URL for the Ollama provider (default `http://localhost:11434`).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            url: None,
            timeout_secs: 120,
        }
    }
}

fn default_llm_provider() -> String {
    "disabled".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Response language: `"en"` or `"fa"`.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.max_chunk_chars == 0 {
        anyhow::bail!("chunking.max_chunk_chars must be > 0");
    }
    if config.chunking.min_chunk_chars >= config.chunking.max_chunk_chars {
        anyhow::bail!("chunking.min_chunk_chars must be < chunking.max_chunk_chars");
    }

    // Validate retrieval
    if config.retrieval.top_chunks == 0 || config.retrieval.fallback_top_chunks == 0 {
        anyhow::bail!("retrieval.top_chunks and retrieval.fallback_top_chunks must be >= 1");
    }
    if !(0.0..=1.0).contains(&config.retrieval.context_floor) {
        anyhow::bail!("retrieval.context_floor must be in [0.0, 1.0]");
    }
    if !(0.0..=1.0).contains(&config.retrieval.source_floor) {
        anyhow::bail!("retrieval.source_floor must be in [0.0, 1.0]");
    }
    if config.retrieval.max_sources == 0 {
        anyhow::bail!("retrieval.max_sources must be >= 1");
    }

    // Validate llm
    match config.llm.provider.as_str() {
        "disabled" | "ollama" | "google" => {}
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be disabled, ollama, or google.",
            other
        ),
    }
    if config.llm.provider != "disabled" && config.llm.model.is_none() {
        anyhow::bail!(
            "llm.model must be specified when provider is '{}'",
            config.llm.provider
        );
    }

    // Validate app
    match config.app.language.as_str() {
        "en" | "fa" => {}
        other => anyhow::bail!("Unknown app language: '{}'. Must be en or fa.", other),
    }

    Ok(config)
}
