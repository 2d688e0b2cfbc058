//! Retrieval-augmented answering.
//!
//! Retrieval runs against a borrowed index and produces an owned
//! [`Retrieval`]; generation then works only on that, so callers can release
//! their hold on the index before the model is called.

use super::types::{FragmentStream, RagAnswer, RagSourceRef, StreamingAnswer};
use crate::chunk::Chunk;
use crate::embeddings::BoundProvider;
use crate::vector_index::VectorIndex;
use futures::StreamExt;
use lexora_core::AppResult;
use lexora_llm::{LlmClient, LlmRequest, LlmStream};
use std::collections::HashSet;
use std::sync::Arc;

const MAX_SNIPPET_CHARS: usize = 150;

/// Chunks retrieved for one question, closest first.
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub question: String,
    pub hits: Vec<(Chunk, f32)>,
}

impl Retrieval {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

pub struct RagPipeline {
    llm: Arc<dyn LlmClient>,
    model: String,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, top_k: usize) -> Self {
        Self {
            llm,
            model: model.into(),
            top_k: top_k.max(1),
        }
    }

    /// Find the `top_k` chunks most similar to the question.
    pub async fn retrieve(
        &self,
        question: &str,
        index: &VectorIndex,
        embedder: &BoundProvider,
    ) -> AppResult<Retrieval> {
        let hits = index.search(embedder, question, self.top_k).await?;

        tracing::debug!(
            retrieved = hits.len(),
            top_score = hits.first().map(|(_, s)| *s),
            "Retrieved context"
        );

        Ok(Retrieval {
            question: question.to_string(),
            hits,
        })
    }

    /// Answer in one piece. An empty retrieval gets the no-documents reply
    /// without calling the model.
    pub async fn generate(&self, retrieval: Retrieval) -> AppResult<RagAnswer> {
        if retrieval.is_empty() {
            return Ok(RagAnswer::no_documents());
        }

        let request = self.build_request(&retrieval)?;
        let response = self.llm.complete(&request).await?;

        tracing::info!(
            model = %self.model,
            sources = retrieval.hits.len(),
            completion_tokens = response.usage.completion_tokens,
            "Generated answer"
        );

        Ok(RagAnswer::new(response.content, map_hits_to_sources(&retrieval.hits)))
    }

    /// Answer as a stream of fragments.
    pub async fn generate_stream(&self, retrieval: Retrieval) -> AppResult<StreamingAnswer> {
        if retrieval.is_empty() {
            return Ok(StreamingAnswer::no_documents());
        }

        let request = self.build_request(&retrieval)?.with_streaming();
        let stream = self.llm.stream(&request).await?;

        tracing::info!(model = %self.model, sources = retrieval.hits.len(), "Streaming answer");

        Ok(StreamingAnswer::new(
            map_hits_to_sources(&retrieval.hits),
            fragments(stream),
        ))
    }

    pub async fn answer(
        &self,
        question: &str,
        index: &VectorIndex,
        embedder: &BoundProvider,
    ) -> AppResult<RagAnswer> {
        let retrieval = self.retrieve(question, index, embedder).await?;
        self.generate(retrieval).await
    }

    pub async fn answer_stream(
        &self,
        question: &str,
        index: &VectorIndex,
        embedder: &BoundProvider,
    ) -> AppResult<StreamingAnswer> {
        let retrieval = self.retrieve(question, index, embedder).await?;
        self.generate_stream(retrieval).await
    }

    fn build_request(&self, retrieval: &Retrieval) -> AppResult<LlmRequest> {
        let texts: Vec<&str> = retrieval.hits.iter().map(|(c, _)| c.text.as_str()).collect();
        let prompt = lexora_prompt::build_grounded_prompt(&retrieval.question, &texts)?;

        tracing::debug!(
            template = %prompt.metadata.template_id,
            context_chunks = prompt.metadata.context_chunks,
            context_chars = prompt.metadata.context_chars,
            "Built prompt"
        );

        Ok(LlmRequest::new(prompt.text, self.model.clone()))
    }
}

/// Non-empty content in order, ending after the chunk marked done.
fn fragments(stream: LlmStream) -> FragmentStream {
    let fragments = stream
        .scan(false, |finished, item| {
            if *finished {
                return futures::future::ready(None);
            }
            let next = match item {
                Ok(chunk) => {
                    *finished = chunk.done;
                    Ok(Some(chunk.content).filter(|c| !c.is_empty()))
                }
                Err(e) => {
                    *finished = true;
                    Err(e)
                }
            };
            futures::future::ready(Some(next))
        })
        .filter_map(|item| futures::future::ready(item.transpose()));

    Box::pin(fragments)
}

/// One reference per (source, location), in similarity order.
fn map_hits_to_sources(hits: &[(Chunk, f32)]) -> Vec<RagSourceRef> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for (chunk, score) in hits {
        let location = chunk.location();
        if !seen.insert((chunk.source.clone(), location.clone())) {
            continue;
        }
        sources.push(RagSourceRef {
            source: chunk.source.clone(),
            location,
            snippet: truncate_snippet(&chunk.text, MAX_SNIPPET_CHARS),
            score: *score,
        });
    }

    sources
}

fn truncate_snippet(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };

    let truncated = &text[..cut];
    match truncated.rfind(char::is_whitespace) {
        Some(space) => format!("{}...", truncated[..space].trim_end()),
        None => format!("{}...", truncated),
    }
}
