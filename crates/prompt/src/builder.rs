//! Prompt builder for rendering templates and injecting retrieved context.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, GROUNDED_ANSWER};
use handlebars::Handlebars;
use lexora_core::{AppError, AppResult};
use std::collections::HashMap;

/// Separator placed between retrieved chunks.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Join chunk texts with a blank line, keeping the given order.
pub fn join_context<S: AsRef<str>>(chunks: &[S]) -> String {
    chunks
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Build the grounded-answer prompt.
///
/// `chunks` must already be ordered closest first; the order is preserved
/// so the most relevant context survives if the model truncates its input.
///
/// # Example
/// ```
/// use lexora_prompt::build_grounded_prompt;
///
/// let built = build_grounded_prompt("What is Lexora?", &["Lexora is a RAG system."]).unwrap();
/// assert!(built.text.contains("Question: What is Lexora?"));
/// ```
pub fn build_grounded_prompt<S: AsRef<str>>(question: &str, chunks: &[S]) -> AppResult<BuiltPrompt> {
    let context = join_context(chunks);

    let mut variables = HashMap::new();
    variables.insert("context".to_string(), context.clone());
    variables.insert("question".to_string(), question.to_string());

    let text = render_template(GROUNDED_ANSWER.template, &variables)?;
    tracing::debug!(
        template = GROUNDED_ANSWER.id,
        context_chunks = chunks.len(),
        "Built prompt"
    );

    Ok(BuiltPrompt {
        text,
        metadata: BuiltPromptMetadata {
            template_id: GROUNDED_ANSWER.id.to_string(),
            context_chunks: chunks.len(),
            context_chars: context.chars().count(),
        },
    })
}

/// Render a Handlebars template with variables, without HTML escaping.
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Hello, world!".to_string());

        let result = render_template("Question: {{question}}", &vars).unwrap();
        assert_eq!(result, "Question: Hello, world!");
    }

    #[test]
    fn test_join_context_uses_blank_line() {
        assert_eq!(join_context(&["first", "second", "third"]), "first\n\nsecond\n\nthird");
        assert_eq!(join_context::<&str>(&[]), "");
    }

    #[test]
    fn test_grounded_prompt_layout() {
        let built = build_grounded_prompt(
            "What is Lexora?",
            &["Lexora is a RAG system.", "It answers questions."],
        )
        .unwrap();

        let expected = "Answer the question concisely based ONLY on the provided context.\n\
If the answer is not in the context, say you don't know.\n\
\n\
Context:\n\
Lexora is a RAG system.\n\
\n\
It answers questions.\n\
\n\
Question: What is Lexora?\n\
\n\
Answer:";
        assert_eq!(built.text, expected);
        assert_eq!(built.metadata.context_chunks, 2);
        assert_eq!(built.metadata.template_id, "lexora.grounded-answer");
    }

    #[test]
    fn test_context_is_not_html_escaped() {
        let built = build_grounded_prompt("a < b?", &["if a < b && c > d"]).unwrap();
        assert!(built.text.contains("if a < b && c > d"));
        assert!(built.text.contains("Question: a < b?"));
    }

    #[test]
    fn test_handlebars_syntax_in_context_is_literal() {
        let built = build_grounded_prompt("q", &["{{question}} stays put"]).unwrap();
        assert!(built.text.contains("{{question}} stays put"));
    }
}
