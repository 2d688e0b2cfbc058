//! Configuration management for Lexora.
//!
//! Configuration is layered, lowest precedence first:
//! - Built-in defaults
//! - Config file (`.lexora/config.yaml` in the workspace, or `LEXORA_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: documents live in
//! `<workspace>/documents` and the persisted index in `<workspace>/.lexora/index`
//! unless overridden.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".lexora";

const KNOWN_LLM_PROVIDERS: &[&str] = &["ollama"];
const KNOWN_EMBEDDING_PROVIDERS: &[&str] = &["ollama", "trigram"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .lexora/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Generation provider (currently "ollama")
    pub provider: String,

    /// Generation model identifier
    pub model: String,

    /// Base URL of the generation provider
    pub llm_endpoint: String,

    /// Timeout for blocking generation calls, in seconds
    pub llm_timeout_secs: u64,

    /// Embedding providers, tried in order at startup
    pub embeddings: Vec<EmbeddingProviderConfig>,

    pub chunking: ChunkingConfig,

    pub retrieval: RetrievalConfig,

    /// Document store override (defaults to `<workspace>/documents`)
    pub documents_dir: Option<PathBuf>,

    /// Persisted index override (defaults to `<workspace>/.lexora/index`)
    pub index_dir: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub log_json: bool,
}

/// One entry of the embedding provider chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingProviderConfig {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    /// Falls back to the LLM endpoint when unset.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    32
}

impl EmbeddingProviderConfig {
    pub fn ollama(model: &str, dimensions: usize) -> Self {
        Self {
            provider: "ollama".to_string(),
            model: model.to_string(),
            dimensions,
            endpoint: None,
            batch_size: default_batch_size(),
        }
    }

    pub fn trigram(dimensions: usize) -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "hashed-trigram-v1".to_string(),
            dimensions,
            endpoint: None,
            batch_size: 256,
        }
    }
}

/// Chunk window parameters, measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: 500,
            overlap: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSection>,
    embeddings: Option<Vec<EmbeddingProviderConfig>>,
    chunking: Option<ChunkingConfig>,
    retrieval: Option<RetrievalConfig>,
    documents: Option<PathSection>,
    index: Option<PathSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LlmSection {
    provider: Option<String>,
    endpoint: Option<String>,
    model: Option<String>,
    timeout: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PathSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(),
            model: "mistral".to_string(),
            llm_endpoint: "http://localhost:11434".to_string(),
            llm_timeout_secs: 120,
            embeddings: vec![
                EmbeddingProviderConfig::ollama("all-minilm", 384),
                EmbeddingProviderConfig::trigram(384),
            ],
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            documents_dir: None,
            index_dir: None,
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and environment variables.
    ///
    /// Environment variables:
    /// - `LEXORA_WORKSPACE`: Override workspace path
    /// - `LEXORA_CONFIG`: Path to config file
    /// - `LEXORA_PROVIDER`: Generation provider
    /// - `LEXORA_MODEL`: Generation model
    /// - `LEXORA_LLM_ENDPOINT`: Generation provider base URL
    /// - `LEXORA_DOCUMENTS_DIR`: Document store directory
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use lexora_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Documents: {:?}", config.documents_dir());
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_for(None, None)
    }

    /// Like [`AppConfig::load`], with the workspace and config file chosen by
    /// the caller (e.g. command-line flags) taking precedence, so the right
    /// config file is read.
    pub fn load_for(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) =
            workspace.or_else(|| std::env::var("LEXORA_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        if let Some(config_file) =
            config_file.or_else(|| std::env::var("LEXORA_CONFIG").ok().map(PathBuf::from))
        {
            config.config_file = Some(config_file);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.state_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("LEXORA_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("LEXORA_MODEL") {
            config.model = model;
        }

        if let Ok(endpoint) = std::env::var("LEXORA_LLM_ENDPOINT") {
            config.llm_endpoint = endpoint;
        }

        if let Ok(dir) = std::env::var("LEXORA_DOCUMENTS_DIR") {
            config.documents_dir = Some(PathBuf::from(dir));
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(llm) = config_file.llm {
            if let Some(provider) = llm.provider {
                result.provider = provider;
            }
            if let Some(endpoint) = llm.endpoint {
                result.llm_endpoint = endpoint;
            }
            if let Some(model) = llm.model {
                result.model = model;
            }
            if let Some(timeout) = llm.timeout {
                result.llm_timeout_secs = timeout;
            }
        }

        if let Some(embeddings) = config_file.embeddings {
            result.embeddings = embeddings;
        }

        if let Some(chunking) = config_file.chunking {
            result.chunking = chunking;
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(path) = config_file.documents.and_then(|d| d.path) {
            result.documents_dir = Some(result.resolve(&path));
        }

        if let Some(path) = config_file.index.and_then(|i| i.path) {
            result.index_dir = Some(result.resolve(&path));
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        log_json: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
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

        if log_json {
            self.log_json = true;
        }

        self
    }

    /// Path to the `.lexora` state directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the `.lexora` state directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.documents_dir
            .clone()
            .unwrap_or_else(|| self.workspace.join("documents"))
    }

    pub fn index_dir(&self) -> PathBuf {
        self.index_dir
            .clone()
            .unwrap_or_else(|| self.state_dir().join("index"))
    }

    /// Relative paths in the config file are relative to the workspace.
    fn resolve(&self, path: &str) -> PathBuf {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            path
        } else {
            self.workspace.join(path)
        }
    }

    /// Validate provider names and numeric parameters.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_LLM_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_LLM_PROVIDERS.join(", ")
            )));
        }

        if self.embeddings.is_empty() {
            return Err(AppError::Config(
                "At least one embedding provider must be configured".to_string(),
            ));
        }

        for entry in &self.embeddings {
            if !KNOWN_EMBEDDING_PROVIDERS.contains(&entry.provider.as_str()) {
                return Err(AppError::Config(format!(
                    "Unknown embedding provider: {}. Supported: {}",
                    entry.provider,
                    KNOWN_EMBEDDING_PROVIDERS.join(", ")
                )));
            }
            if entry.dimensions == 0 || entry.batch_size == 0 {
                return Err(AppError::Config(format!(
                    "Embedding provider {} needs non-zero dimensions and batchSize",
                    entry.provider
                )));
            }
        }

        if self.chunking.size == 0 || self.chunking.overlap >= self.chunking.size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunking.overlap, self.chunking.size
            )));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("retrieval.topK must be at least 1".to_string()));
        }

        Ok(())
    }
}
