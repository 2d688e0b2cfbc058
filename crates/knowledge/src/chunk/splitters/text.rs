//! Boundary-aware splitter using the text-splitter crate.

use super::{ChunkSplitter, Window};
use crate::chunk::ChunkConfig;
use lexora_core::{AppError, AppResult};
use text_splitter::{Characters, ChunkConfig as SplitterConfig, TextSplitter};

/// Prefers paragraph, then sentence, then word boundaries; sizes are
/// measured in characters.
pub struct SemanticSplitter {
    inner: TextSplitter<Characters>,
}

impl SemanticSplitter {
    pub fn new(config: &ChunkConfig) -> AppResult<Self> {
        let splitter_config = SplitterConfig::new(config.max_chunk_size)
            .with_overlap(config.overlap)
            .map_err(|e| AppError::Config(format!("Invalid chunk configuration: {}", e)))?
            .with_trim(true);

        Ok(Self {
            inner: TextSplitter::new(splitter_config),
        })
    }
}

impl ChunkSplitter for SemanticSplitter {
    fn name(&self) -> &'static str {
        "text-splitter"
    }

    fn split(&self, text: &str) -> Vec<Window> {
        let windows: Vec<Window> = self
            .inner
            .chunk_indices(text)
            .filter(|(_, chunk)| !chunk.trim().is_empty())
            .map(|(offset, chunk)| Window {
                text: chunk.to_string(),
                byte_range: (offset, offset + chunk.len()),
            })
            .collect();

        tracing::trace!(
            "Text splitter created {} windows from {} bytes",
            windows.len(),
            text.len()
        );

        windows
    }
}
