//! Chunking pipeline orchestrator.

use super::{
    splitters::{ChunkSplitter, SemanticSplitter, WindowSplitter},
    Chunk,
};
use crate::loader::{DocumentType, ExtractedText};
use lexora_core::config::ChunkingConfig;
use lexora_core::{AppError, AppResult};

/// Configuration for the chunking pipeline, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Upper bound on chunk length
    pub max_chunk_size: usize,

    /// Characters shared by consecutive chunks
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 500,
            overlap: 50,
        }
    }
}

impl From<&ChunkingConfig> for ChunkConfig {
    fn from(config: &ChunkingConfig) -> Self {
        Self {
            max_chunk_size: config.size,
            overlap: config.overlap,
        }
    }
}

impl ChunkConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.max_chunk_size == 0 || self.overlap >= self.max_chunk_size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.overlap, self.max_chunk_size
            )));
        }
        Ok(())
    }
}

/// Turns extracted text into chunks. Deterministic: the same input always
/// yields the same chunks, ids included.
pub struct ChunkPipeline {
    config: ChunkConfig,
    semantic: SemanticSplitter,
    window: WindowSplitter,
}

impl ChunkPipeline {
    pub fn new(config: ChunkConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            semantic: SemanticSplitter::new(&config)?,
            window: WindowSplitter::new(&config),
        })
    }

    pub fn config(&self) -> ChunkConfig {
        self.config
    }

    /// Split a plain-text document. Empty or whitespace-only text yields no chunks.
    pub fn split(&self, source: &str, text: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        self.split_segment(source, DocumentType::PlainText, text, None, &mut chunks);
        chunks
    }

    /// Split every segment of an extracted document. Positions run on across
    /// segments; each chunk records its page.
    pub fn split_document(
        &self,
        source: &str,
        document_type: DocumentType,
        segments: &[ExtractedText],
    ) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for segment in segments {
            self.split_segment(source, document_type, &segment.text, segment.page, &mut chunks);
        }

        tracing::debug!(
            source,
            segments = segments.len(),
            chunks = chunks.len(),
            "Chunking complete"
        );

        chunks
    }

    fn split_segment(
        &self,
        source: &str,
        document_type: DocumentType,
        text: &str,
        page: Option<u32>,
        out: &mut Vec<Chunk>,
    ) {
        if text.trim().is_empty() {
            return;
        }

        let splitter = self.dispatch_splitter(text);
        for window in splitter.split(text) {
            let position = out.len() as u32;
            out.push(Chunk::new(
                source,
                position,
                window.text,
                document_type,
                page,
                window.byte_range,
                splitter.name(),
            ));
        }
    }

    /// Text without any whitespace has no natural boundary to respect.
    fn dispatch_splitter(&self, text: &str) -> &dyn ChunkSplitter {
        if text.contains(char::is_whitespace) {
            &self.semantic
        } else {
            &self.window
        }
    }
}
