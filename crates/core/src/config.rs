//! Configuration management for Docu Assistant.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - Config file (`.docu/config.yaml` in the workspace, or `DOCU_CONFIG`)
//! - Environment variables (usually populated from `.env` at startup)
//! - Command-line flags
//!
//! Nothing is persisted: indexes and chats live only in the running process.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Chat-completion providers the LLM factory can build.
pub const CHAT_PROVIDERS: [&str; 2] = ["openai", "ollama"];

/// Embedding providers the embedding factory can build.
pub const EMBEDDING_PROVIDERS: [&str; 3] = ["openai", "ollama", "trigram"];

/// Environment variable holding the OpenAI key when no provider config names one.
pub const DEFAULT_OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Workspace root (contains the optional `.docu/` directory)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Chat-completion provider ("openai", "ollama")
    pub provider: String,

    /// Chat model identifier
    pub model: String,

    /// Embedding provider ("openai", "ollama", "trigram")
    pub embedding_provider: String,

    /// Embedding model identifier; `None` uses the embedding provider's default
    pub embedding_model: Option<String>,

    /// Explicit API key, overrides provider-specific key variables
    pub api_key: Option<String>,

    /// Address the web UI binds to
    pub bind: String,

    /// Most browser sessions kept at once; the least recently used is evicted
    pub max_sessions: usize,

    /// Seconds of inactivity after which a session is dropped
    pub session_idle_secs: u64,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Provider configurations from config.yaml
    pub llm: Option<LlmConfig>,

    /// Chunking and retrieval settings
    pub knowledge: KnowledgeSettings,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(rename = "activeEmbeddingProvider")]
    pub active_embedding_provider: String,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        endpoint: Option<String>,
        #[serde(rename = "organizationEnv")]
        organization_env: Option<String>,
        timeout: Option<u64>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        timeout: Option<u64>,
    },
    Trigram {
        dimensions: usize,
    },
}

impl ProviderConfig {
    /// Endpoint override, if the provider has one.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::OpenAI { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint),
            Self::Trigram { .. } => None,
        }
    }

    /// Request timeout in seconds, if configured.
    pub fn timeout(&self) -> Option<u64> {
        match self {
            Self::OpenAI { timeout, .. } | Self::Ollama { timeout, .. } => *timeout,
            Self::Trigram { .. } => None,
        }
    }
}

/// Chunking and retrieval settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeSettings {
    /// Maximum chunk length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Optional separator the chunker splits on before merging
    #[serde(default)]
    pub separator: Option<String>,

    /// Number of chunks retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Rewrite follow-up questions into standalone ones before retrieval
    #[serde(default)]
    pub condense_question: bool,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    4
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            separator: None,
            top_k: default_top_k(),
            condense_question: false,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    knowledge: Option<KnowledgeSettings>,
    server: Option<ServerConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerConfig {
    bind: Option<String>,
    max_sessions: Option<usize>,
    session_idle_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "openai".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            embedding_provider: "openai".to_string(),
            embedding_model: None,
            api_key: None,
            bind: "127.0.0.1:8501".to_string(),
            max_sessions: 1000,
            session_idle_secs: 3600,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            knowledge: KnowledgeSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment, using its workspace and config file.
    ///
    /// Environment variables:
    /// - `DOCU_WORKSPACE`: Override workspace path
    /// - `DOCU_CONFIG`: Path to config file
    /// - `DOCU_PROVIDER` / `DOCU_MODEL`: Chat provider and model
    /// - `DOCU_EMBEDDING_PROVIDER` / `DOCU_EMBEDDING_MODEL`: Embedding provider and model
    /// - `DOCU_API_KEY`: API key
    /// - `DOCU_BIND`: Web UI bind address
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use docu_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration with an explicit workspace and/or config file.
    ///
    /// Explicit arguments win over `DOCU_WORKSPACE` and `DOCU_CONFIG`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        let workspace =
            workspace.or_else(|| std::env::var("DOCU_WORKSPACE").ok().map(PathBuf::from));
        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var("DOCU_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.docu_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("DOCU_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("DOCU_MODEL") {
            config.model = model;
        }

        if let Ok(provider) = std::env::var("DOCU_EMBEDDING_PROVIDER") {
            config.embedding_provider = provider;
        }

        if let Ok(model) = std::env::var("DOCU_EMBEDDING_MODEL") {
            config.embedding_model = Some(model);
        }

        if let Ok(bind) = std::env::var("DOCU_BIND") {
            config.bind = bind;
        }

        if let Ok(key) = std::env::var("DOCU_API_KEY") {
            config.api_key = Some(key);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var_os("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(server) = config_file.server {
            if let Some(bind) = server.bind {
                result.bind = bind;
            }
            if let Some(max_sessions) = server.max_sessions {
                result.max_sessions = max_sessions;
            }
            if let Some(idle) = server.session_idle_secs {
                result.session_idle_secs = idle;
            }
        }

        if let Some(knowledge) = config_file.knowledge {
            result.knowledge = knowledge;
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();
            result.embedding_provider = llm.active_embedding_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                match provider_config {
                    ProviderConfig::OpenAI { model, .. } | ProviderConfig::Ollama { model, .. } => {
                        result.model = model.clone();
                    }
                    ProviderConfig::Trigram { .. } => {}
                }
            }

            if let Some(provider_config) = llm.providers.get(&llm.active_embedding_provider) {
                match provider_config {
                    ProviderConfig::OpenAI {
                        embedding_model: Some(model),
                        ..
                    }
                    | ProviderConfig::Ollama {
                        embedding_model: Some(model),
                        ..
                    } => result.embedding_model = Some(model.clone()),
                    ProviderConfig::Trigram { .. } => {
                        result.embedding_model = Some("trigram-v1".to_string());
                    }
                    _ => {}
                }
            }

            result.llm = Some(llm);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        embedding_provider: Option<String>,
        bind: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(embedding_provider) = embedding_provider {
            self.embedding_provider = embedding_provider;
        }

        if let Some(bind) = bind {
            self.bind = bind;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .docu directory.
    pub fn docu_dir(&self) -> PathBuf {
        self.workspace.join(".docu")
    }

    /// Get a provider's configuration block, if config.yaml declared one.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Endpoint override for a provider.
    pub fn provider_endpoint(&self, provider: &str) -> Option<String> {
        self.get_provider_config(provider)
            .and_then(|pc| pc.endpoint())
            .map(str::to_string)
    }

    /// Request timeout for a provider, in seconds.
    pub fn provider_timeout(&self, provider: &str) -> u64 {
        self.get_provider_config(provider)
            .and_then(|pc| pc.timeout())
            .unwrap_or(120)
    }

    /// Embedding model to request: the configured one, or the embedding
    /// provider's default.
    pub fn resolved_embedding_model(&self) -> String {
        if let Some(model) = &self.embedding_model {
            return model.clone();
        }
        match self.embedding_provider.as_str() {
            "ollama" => "nomic-embed-text",
            "trigram" => "trigram-v1",
            _ => "text-embedding-ada-002",
        }
        .to_string()
    }

    /// Embedding dimensions declared for the trigram provider.
    pub fn trigram_dimensions(&self) -> usize {
        match self.get_provider_config("trigram") {
            Some(ProviderConfig::Trigram { dimensions }) => *dimensions,
            _ => 384,
        }
    }

    /// Name of the environment variable holding a provider's API key.
    fn api_key_env(&self, provider: &str) -> Option<String> {
        match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { api_key_env, .. }) => Some(api_key_env.clone()),
            Some(_) => None,
            None if provider == "openai" => Some(DEFAULT_OPENAI_KEY_ENV.to_string()),
            None => None,
        }
    }

    /// Resolve the API key for a provider.
    ///
    /// `DOCU_API_KEY` wins; otherwise the provider's key variable is read
    /// from the environment.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        self.api_key_env(provider)
            .and_then(|env_var| std::env::var(env_var).ok())
    }

    /// Validate configuration for the active providers.
    pub fn validate(&self) -> AppResult<()> {
        if !CHAT_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                CHAT_PROVIDERS.join(", ")
            )));
        }

        if !EMBEDDING_PROVIDERS.contains(&self.embedding_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding_provider,
                EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        for provider in [&self.provider, &self.embedding_provider] {
            if let Some(env_var) = self.api_key_env(provider) {
                if self.resolve_api_key(provider).is_none() {
                    return Err(AppError::Config(format!(
                        "API key for '{}' not found in environment variable: {}",
                        provider, env_var
                    )));
                }
            }
        }

        let k = &self.knowledge;
        if k.chunk_size == 0 || k.chunk_overlap >= k.chunk_size {
            return Err(AppError::Config(format!(
                "Invalid chunking: size {} must be positive and larger than overlap {}",
                k.chunk_size, k.chunk_overlap
            )));
        }

        if k.top_k == 0 {
            return Err(AppError::Config("topK must be at least 1".to_string()));
        }

        if self.max_sessions == 0 {
            return Err(AppError::Config("maxSessions must be at least 1".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.knowledge.chunk_size, 1000);
        assert_eq!(config.knowledge.chunk_overlap, 200);
        assert_eq!(config.knowledge.separator, None);
        assert!(!config.verbose);
    }

    #[test]
    fn test_docu_dir() {
        let config = AppConfig::default();
        assert!(config.docu_dir().ends_with(".docu"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            Some("trigram".to_string()),
            Some("0.0.0.0:9000".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "ollama");
        assert_eq!(overridden.model, "llama3.2");
        assert_eq!(overridden.embedding_provider, "trigram");
        assert_eq!(overridden.bind, "0.0.0.0:9000");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_embedding_model_follows_provider() {
        let mut config = AppConfig::default();
        assert_eq!(config.resolved_embedding_model(), "text-embedding-ada-002");

        config.embedding_provider = "ollama".to_string();
        assert_eq!(config.resolved_embedding_model(), "nomic-embed-text");

        config.embedding_model = Some("mxbai-embed-large".to_string());
        assert_eq!(config.resolved_embedding_model(), "mxbai-embed-large");
    }

    #[test]
    fn test_validate_local_providers() {
        let mut config = AppConfig::default();
        config.provider = "ollama".to_string();
        config.embedding_provider = "trigram".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_openai_with_explicit_key() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-test".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_chunking() {
        let mut config = AppConfig::default();
        config.provider = "ollama".to_string();
        config.embedding_provider = "trigram".to_string();
        config.knowledge.chunk_overlap = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  activeProvider: ollama
  activeEmbeddingProvider: trigram
  providers:
    ollama:
      endpoint: http://localhost:11434
      model: llama3.2
    trigram:
      dimensions: 256
knowledge:
  chunkSize: 500
  chunkOverlap: 50
  separator: "\n"
server:
  bind: 127.0.0.1:9999
  maxSessions: 50
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(Some(temp.path().to_path_buf()), Some(path)).unwrap();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.embedding_provider, "trigram");
        assert_eq!(config.resolved_embedding_model(), "trigram-v1");
        assert_eq!(config.trigram_dimensions(), 256);
        assert_eq!(config.knowledge.chunk_size, 500);
        assert_eq!(config.knowledge.separator.as_deref(), Some("\n"));
        assert_eq!(config.knowledge.top_k, 4);
        assert_eq!(config.bind, "127.0.0.1:9999");
        assert_eq!(config.max_sessions, 50);
        assert_eq!(config.session_idle_secs, 3600);
        assert_eq!(
            config.provider_endpoint("ollama").as_deref(),
            Some("http://localhost:11434")
        );
    }

    #[test]
    fn test_load_from_missing_explicit_file() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load_from(
            Some(temp.path().to_path_buf()),
            Some(temp.path().join("nope.yaml")),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_missing_workspace() {
        let result = AppConfig::load_from(Some(PathBuf::from("/definitely/not/here")), None);
        assert!(result.is_err());
    }
}
