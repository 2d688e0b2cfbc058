//! Result types of the index manager's operations.

use crate::embeddings::EmbeddingSpace;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Whether the engine currently holds an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    Absent,
    Loaded,
}

/// What happened to a single file handed to `index_file`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum IndexOutcome {
    /// The file's chunks were appended to the index.
    Indexed {
        source: String,
        chunks: usize,
        total_records: usize,
    },

    /// The file replaced an already indexed version, so the whole index was rebuilt.
    Rebuilt { source: String, report: ReindexReport },

    /// The file could not be used; the index was not touched.
    Skipped { source: String, reason: String },
}

impl IndexOutcome {
    pub fn source(&self) -> &str {
        match self {
            Self::Indexed { source, .. } | Self::Rebuilt { source, .. } | Self::Skipped { source, .. } => {
                source
            }
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedFile {
    pub source: String,
    pub chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub source: String,
    pub reason: String,
}

/// Summary of a full rebuild.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReindexReport {
    /// Supported files found in the documents directory
    pub documents: usize,
    pub indexed: Vec<IndexedFile>,
    pub skipped: Vec<SkippedFile>,
    /// Records in the resulting index; zero means the index is now absent
    pub records: usize,
    pub duration_secs: f64,
}

impl ReindexReport {
    pub fn status(&self) -> IndexStatus {
        if self.records == 0 {
            IndexStatus::Absent
        } else {
            IndexStatus::Loaded
        }
    }
}

/// Snapshot of the engine for `stats`.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub status: IndexStatus,
    pub records: usize,
    /// Source documents that have records in the index
    pub indexed_sources: Vec<String>,
    /// Supported documents currently in the documents directory
    pub documents_on_storage: usize,
    /// Space of the bound embedding provider
    pub embedding_space: EmbeddingSpace,
    pub documents_dir: PathBuf,
    pub index_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}
