//! RAG answer types.

use futures::Stream;
use lexora_core::AppResult;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Returned instead of an answer while no document has been indexed.
pub const NO_DOCUMENTS_ANSWER: &str =
    "No documents uploaded yet. Please upload some documents first.";

/// Where a piece of the context came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagSourceRef {
    /// Document filename (e.g., "notes.txt")
    pub source: String,

    /// Human-readable location within the document ("page 2", "chunk 3")
    pub location: String,

    /// Start of the chunk text, truncated at a word boundary
    pub snippet: String,

    pub score: f32,
}

/// A complete answer to a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    pub answer: String,

    /// Context sources, most similar first
    pub sources: Vec<RagSourceRef>,

    /// Highest similarity among the retrieved chunks
    pub max_score: f32,
}

impl RagAnswer {
    pub fn new(answer: String, sources: Vec<RagSourceRef>) -> Self {
        let max_score = sources.first().map(|s| s.score).unwrap_or(0.0);
        Self {
            answer,
            sources,
            max_score,
        }
    }

    /// The fixed reply used when the index has no records.
    pub fn no_documents() -> Self {
        Self {
            answer: NO_DOCUMENTS_ANSWER.to_string(),
            sources: Vec::new(),
            max_score: 0.0,
        }
    }

    pub fn is_no_documents(&self) -> bool {
        self.sources.is_empty() && self.answer == NO_DOCUMENTS_ANSWER
    }
}

/// Non-empty answer fragments in generation order.
pub type FragmentStream = Pin<Box<dyn Stream<Item = AppResult<String>> + Send>>;

/// An answer delivered incrementally. Sources are known up front; dropping
/// `fragments` cancels generation.
pub struct StreamingAnswer {
    pub sources: Vec<RagSourceRef>,
    pub max_score: f32,
    pub fragments: FragmentStream,
}

impl StreamingAnswer {
    pub fn new(sources: Vec<RagSourceRef>, fragments: FragmentStream) -> Self {
        let max_score = sources.first().map(|s| s.score).unwrap_or(0.0);
        Self {
            sources,
            max_score,
            fragments,
        }
    }

    pub fn no_documents() -> Self {
        Self::new(
            Vec::new(),
            Box::pin(futures::stream::iter([Ok(NO_DOCUMENTS_ANSWER.to_string())])),
        )
    }
}

impl std::fmt::Debug for StreamingAnswer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingAnswer")
            .field("sources", &self.sources)
            .field("max_score", &self.max_score)
            .finish_non_exhaustive()
    }
}
