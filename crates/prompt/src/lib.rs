//! Prompt assembly for Lexora.
//!
//! Renders the grounded-answer template: retrieved context first, then the
//! question, with an instruction to answer only from that context.

pub mod builder;
pub mod types;

// Re-export main types
pub use builder::{build_grounded_prompt, join_context, render_template};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptTemplate, GROUNDED_ANSWER};
