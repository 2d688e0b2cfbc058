//! Splitter implementations.

mod text;
mod window;

pub use text::SemanticSplitter;
pub use window::WindowSplitter;

/// A piece of text cut from a segment, before it becomes a [`Chunk`](crate::chunk::Chunk).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub text: String,
    pub byte_range: (usize, usize),
}

/// Trait for chunk splitters.
pub trait ChunkSplitter: Send + Sync {
    /// Name recorded in chunk metadata.
    fn name(&self) -> &'static str;

    /// Split text into windows, in document order.
    fn split(&self, text: &str) -> Vec<Window>;
}
