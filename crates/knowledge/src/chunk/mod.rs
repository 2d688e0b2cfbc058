//! Chunking of extracted document text.
//!
//! Text is cut into windows of at most `max_chunk_size` characters with
//! `overlap` characters shared between neighbours. Natural boundaries
//! (paragraph, sentence, word) are preferred; text with no whitespace at all
//! falls back to a fixed character window.

mod metadata;
mod pipeline;
pub mod splitters;

pub use metadata::{calculate_hash, chunk_id};
pub use pipeline::{ChunkConfig, ChunkPipeline};

use crate::loader::DocumentType;
use serde::{Deserialize, Serialize};

/// A bounded window of a document's text, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Derived from source, position and text, so re-chunking the same
    /// document yields the same ids
    pub id: String,

    /// File name of the source document
    pub source: String,

    /// Chunk position in document (0-indexed)
    pub position: u32,

    pub text: String,

    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub document_type: DocumentType,

    /// Page the chunk came from, for paged formats
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Byte range within the extracted segment
    pub byte_range: (usize, usize),

    pub char_count: usize,

    /// SHA-256 hash of chunk text
    pub hash: String,

    /// "text-splitter" | "window"
    pub splitter_used: String,
}

impl Chunk {
    pub fn new(
        source: &str,
        position: u32,
        text: String,
        document_type: DocumentType,
        page: Option<u32>,
        byte_range: (usize, usize),
        splitter_used: &str,
    ) -> Self {
        let hash = calculate_hash(&text);
        Self {
            id: chunk_id(source, position, &hash),
            source: source.to_string(),
            position,
            metadata: ChunkMetadata {
                document_type,
                page,
                byte_range,
                char_count: text.chars().count(),
                hash,
                splitter_used: splitter_used.to_string(),
            },
            text,
        }
    }

    /// Human-readable location, e.g. `page 3` or `chunk 2`.
    pub fn location(&self) -> String {
        match self.metadata.page {
            Some(page) => format!("page {}", page),
            None => format!("chunk {}", self.position + 1),
        }
    }
}
