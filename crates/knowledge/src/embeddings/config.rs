//! Embedding provider configuration.

use docu_core::AppConfig;
use serde::{Deserialize, Serialize};

/// Settings needed to construct an embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "openai", "ollama", "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Expected embedding vector dimensions
    pub dimensions: usize,

    /// Maximum number of texts per request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Base URL override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_batch_size() -> usize {
    100
}

fn default_timeout() -> u64 {
    120
}

/// Known output sizes of common embedding models.
pub fn known_dimensions(model: &str) -> Option<usize> {
    match model {
        "text-embedding-ada-002" | "text-embedding-3-small" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        "nomic-embed-text" => Some(768),
        "mxbai-embed-large" => Some(1024),
        "all-minilm" => Some(384),
        _ => None,
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            batch_size: default_batch_size(),
            endpoint: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl EmbeddingConfig {
    /// Derive the embedding settings from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Self {
        let provider = config.embedding_provider.clone();

        if provider == "trigram" {
            return Self {
                dimensions: config.trigram_dimensions(),
                ..Default::default()
            };
        }

        let model = config.resolved_embedding_model();
        Self {
            dimensions: known_dimensions(&model).unwrap_or(0),
            endpoint: config.provider_endpoint(&provider),
            timeout_secs: config.provider_timeout(&provider),
            provider,
            model,
            batch_size: default_batch_size(),
        }
    }
}
