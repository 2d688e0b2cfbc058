//! Prompt types for Lexora.

use serde::{Deserialize, Serialize};

/// A named Handlebars template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub id: &'static str,
    pub template: &'static str,
}

/// Answer strictly from the supplied context, otherwise admit ignorance.
pub const GROUNDED_ANSWER: PromptTemplate = PromptTemplate {
    id: "lexora.grounded-answer",
    template: "Answer the question concisely based ONLY on the provided context.\n\
If the answer is not in the context, say you don't know.\n\
\n\
Context:\n\
{{context}}\n\
\n\
Question: {{question}}\n\
\n\
Answer:",
};

/// A prompt ready to send to a generation provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    pub text: String,
    pub metadata: BuiltPromptMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuiltPromptMetadata {
    pub template_id: String,

    /// Number of retrieved chunks placed in the context section
    pub context_chunks: usize,

    /// Length of the context section in characters
    pub context_chars: usize,
}
