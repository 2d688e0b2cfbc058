//! Retrieval-augmented answering over the vector index.

pub mod pipeline;
pub mod types;

pub use pipeline::{RagPipeline, Retrieval};
pub use types::{FragmentStream, RagAnswer, RagSourceRef, StreamingAnswer, NO_DOCUMENTS_ANSWER};
