//! TOML configuration parsing and validation.
//!
//! Every section is optional; an empty file yields a configuration that
//! runs fully offline (in-memory index, embedding and completion disabled).
//! API keys are never read from the file: adapters take them from
//! `OPENAI_API_KEY` and `PINECONE_API_KEY` at construction time.
//!
//! ```toml
//! [retrieval]
//! top_k = 5
//! similarity_threshold = 0.22
//! namespace = "messages"
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-large"
//! dims = 3072
//!
//! [completion]
//! provider = "openai"
//! model = "gpt-4o-mini"
//!
//! [index]
//! provider = "pinecone"
//! host = "https://chat-xxxx.svc.pinecone.io"
//!
//! [server]
//! bind = "127.0.0.1:8000"
//! ```

use anyhow::{bail, Context, Result};
use chat_recall_core::engine::{DEFAULT_NAMESPACE, DEFAULT_TOP_K};
use chat_recall_core::relevance::DEFAULT_SIMILARITY_THRESHOLD;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
fn default_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}
fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_disabled")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_disabled(),
            model: None,
            dims: None,
            url: None,
            max_retries: default_embedding_retries(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_disabled() -> String {
    "disabled".to_string()
}
fn default_embedding_retries() -> u32 {
    5
}
fn default_embedding_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_disabled")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Override for OpenAI-compatible endpoints.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_completion_retries")]
    pub max_retries: u32,
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: default_disabled(),
            model: None,
            temperature: default_temperature(),
            url: None,
            max_retries: default_completion_retries(),
            timeout_secs: default_completion_timeout(),
        }
    }
}

impl CompletionConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_temperature() -> f32 {
    0.7
}
fn default_completion_retries() -> u32 {
    3
}
fn default_completion_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_provider")]
    pub provider: String,
    /// Pinecone index host (data-plane URL).
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_index_timeout")]
    pub timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            provider: default_index_provider(),
            host: None,
            timeout_secs: default_index_timeout(),
        }
    }
}

fn default_index_provider() -> String {
    "memory".to_string()
}
fn default_index_timeout() -> u64 {
    30
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
    "127.0.0.1:8000".to_string()
}

/// Read, parse, and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate retrieval
    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }
    let threshold = config.retrieval.similarity_threshold;
    if !threshold.is_finite() || !(-1.0..=1.0).contains(&threshold) {
        bail!("retrieval.similarity_threshold must be in [-1.0, 1.0]");
    }
    if config.retrieval.namespace.trim().is_empty() {
        bail!("retrieval.namespace must not be empty");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }
    if config.embedding.is_enabled() {
        if config.embedding.model.is_none() {
            bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.dims == Some(0) {
            bail!("embedding.dims must be > 0");
        }
    }

    // Validate completion
    match config.completion.provider.as_str() {
        "disabled" | "openai" => {}
        other => bail!(
            "Unknown completion provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    if config.completion.is_enabled() && config.completion.model.is_none() {
        bail!(
            "completion.model must be specified when provider is '{}'",
            config.completion.provider
        );
    }
    if !(0.0..=2.0).contains(&config.completion.temperature) {
        bail!("completion.temperature must be in [0.0, 2.0]");
    }

    // Validate index
    match config.index.provider.as_str() {
        "memory" => {}
        "pinecone" => {
            if config.index.host.as_deref().map_or(true, |h| h.trim().is_empty()) {
                bail!("index.host must be specified when provider is 'pinecone'");
            }
        }
        other => bail!(
            "Unknown index provider: '{}'. Must be memory or pinecone.",
            other
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.similarity_threshold, 0.22);
        assert_eq!(config.retrieval.namespace, "messages");
        assert!(!config.embedding.is_enabled());
        assert!(!config.completion.is_enabled());
        assert_eq!(config.completion.temperature, 0.7);
        assert_eq!(config.index.provider, "memory");
        assert_eq!(config.server.bind, "127.0.0.1:8000");
    }

    #[test]
    fn test_full_config() {
        let config = parse_config(
            r#"
[retrieval]
top_k = 8
similarity_threshold = 0.3
namespace = "archive"

[embedding]
provider = "openai"
model = "text-embedding-3-large"
dims = 3072

[completion]
provider = "openai"
model = "gpt-4o-mini"
temperature = 0.2

[index]
provider = "pinecone"
host = "https://chat.svc.pinecone.io"

[server]
bind = "0.0.0.0:9000"
"#,
        )
        .unwrap();
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.retrieval.namespace, "archive");
        assert_eq!(config.embedding.dims, Some(3072));
        assert_eq!(config.completion.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(
            config.index.host.as_deref(),
            Some("https://chat.svc.pinecone.io")
        );
    }

    #[test]
    fn test_rejects_zero_top_k() {
        let err = parse_config("[retrieval]\ntop_k = 0\n").unwrap_err();
        assert!(err.to_string().contains("top_k"));
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        assert!(parse_config("[retrieval]\nsimilarity_threshold = 1.5\n").is_err());
    }

    #[test]
    fn test_rejects_unknown_providers() {
        assert!(parse_config("[embedding]\nprovider = \"magic\"\n").is_err());
        assert!(parse_config("[completion]\nprovider = \"magic\"\n").is_err());
        assert!(parse_config("[index]\nprovider = \"magic\"\n").is_err());
    }

    #[test]
    fn test_enabled_provider_requires_model() {
        let err = parse_config("[embedding]\nprovider = \"openai\"\n").unwrap_err();
        assert!(err.to_string().contains("embedding.model"));
        let err = parse_config("[completion]\nprovider = \"openai\"\n").unwrap_err();
        assert!(err.to_string().contains("completion.model"));
    }

    #[test]
    fn test_pinecone_requires_host() {
        let err = parse_config("[index]\nprovider = \"pinecone\"\n").unwrap_err();
        assert!(err.to_string().contains("index.host"));
    }
}
