//! Engine settings derived from the application configuration.

use crate::chunk::ChunkConfig;
use lexora_core::{AppConfig, AppError, AppResult};
use std::path::PathBuf;

/// Everything a [`crate::RagEngine`] needs to know about its surroundings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding uploaded documents
    pub documents_dir: PathBuf,

    /// Directory the vector index is persisted to
    pub index_dir: PathBuf,

    pub chunking: ChunkConfig,

    /// Chunks retrieved per question
    pub top_k: usize,

    /// Generation model name passed to the LLM client
    pub model: String,
}

impl EngineConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            documents_dir: config.documents_dir(),
            index_dir: config.index_dir(),
            chunking: ChunkConfig::from(&config.chunking),
            top_k: config.retrieval.top_k,
            model: config.model.clone(),
        }
    }

    /// Settings rooted in a single directory, with default chunking and retrieval.
    pub fn in_dir(root: impl Into<PathBuf>, model: impl Into<String>) -> Self {
        let root = root.into();
        Self {
            documents_dir: root.join("documents"),
            index_dir: root.join("index"),
            chunking: ChunkConfig::default(),
            top_k: crate::vector_index::DEFAULT_TOP_K,
            model: model.into(),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        self.chunking.validate()?;
        if self.top_k == 0 {
            return Err(AppError::Config("Retrieval top_k must be at least 1".to_string()));
        }
        if self.documents_dir == self.index_dir {
            return Err(AppError::Config(
                "Documents and index directories must differ".to_string(),
            ));
        }
        Ok(())
    }
}
