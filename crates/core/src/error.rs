//! Error types for Lexora.
//!
//! One enum covers the whole pipeline: ingestion (unsupported type,
//! extraction), providers (embedding, generation), index lifecycle
//! (load, persist) and bad user input.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for Lexora.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic; errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File extension has no registered loader
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Document does not exist in the document store
    #[error("Document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    /// A loader could not read the content of a document
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Embedding provider unavailable or returned unusable vectors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Persisted index missing, corrupt, or built in another embedding space
    #[error("Index load error: {0}")]
    IndexLoad(String),

    /// Persisting the index failed
    #[error("Index error: {0}")]
    Index(String),

    /// Language model call failed or timed out
    #[error("Generation error: {0}")]
    Generation(String),

    /// Prompt rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Question was empty or whitespace only
    #[error("Question cannot be empty")]
    EmptyQuestion,

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Errors caused by a single bad input file. Bulk ingestion skips these
    /// and keeps going.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            AppError::Extraction(_) | AppError::DocumentNotFound(_) | AppError::UnsupportedFileType(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
