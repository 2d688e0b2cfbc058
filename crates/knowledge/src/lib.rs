//! Document ingestion, vector indexing and retrieval-augmented answering.
//!
//! The [`RagEngine`] is the entry point: it owns the vector index, keeps it
//! in step with the documents directory, and answers questions from it.

pub mod chunk;
pub mod config;
pub mod embeddings;
pub mod engine;
pub mod loader;
pub mod progress;
pub mod rag;
pub mod store;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

pub use chunk::{Chunk, ChunkConfig, ChunkPipeline};
pub use config::EngineConfig;
pub use embeddings::{bind_provider, BoundProvider, EmbeddingProvider, EmbeddingSpace};
pub use engine::RagEngine;
pub use loader::{DocumentLoader, DocumentType, ExtractedText, LoaderRegistry};
pub use progress::{ProgressEvent, ProgressPhase, ProgressReporter};
pub use rag::{RagAnswer, RagSourceRef, StreamingAnswer, NO_DOCUMENTS_ANSWER};
pub use store::{DocumentStore, StoredDocument};
pub use types::{IndexOutcome, IndexStats, IndexStatus, IndexedFile, ReindexReport, SkippedFile};
pub use vector_index::VectorIndex;
