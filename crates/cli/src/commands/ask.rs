//! Ask command handler.
//!
//! Answers a question from the indexed documents, streaming the answer to
//! stdout as it is generated unless `--no-stream` or `--json` is given.

use super::print_json;
use clap::Args;
use futures::StreamExt;
use lexora_core::AppResult;
use lexora_knowledge::{RagEngine, RagSourceRef};
use std::io::Write;

/// Ask a question about the uploaded documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Wait for the full answer instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Show the sources the answer was drawn from
    #[arg(short, long)]
    pub sources: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, engine: &RagEngine) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        if self.no_stream || self.json {
            self.handle_non_streaming(engine).await
        } else {
            self.handle_streaming(engine).await
        }
    }

    async fn handle_non_streaming(&self, engine: &RagEngine) -> AppResult<()> {
        let answer = engine.query(&self.question).await?;

        if self.json {
            let output = serde_json::json!({
                "question": self.question.trim(),
                "answer": answer.answer,
                "sources": answer.sources,
                "maxScore": answer.max_score,
            });
            return print_json(&output);
        }

        println!("{}", answer.answer);
        self.print_sources(&answer.sources);
        Ok(())
    }

    async fn handle_streaming(&self, engine: &RagEngine) -> AppResult<()> {
        let mut streaming = engine.stream_query(&self.question).await?;

        let mut stdout = std::io::stdout();
        while let Some(fragment) = streaming.fragments.next().await {
            let fragment = fragment?;
            print!("{}", fragment);
            stdout.flush().ok();
        }
        println!();

        self.print_sources(&streaming.sources);
        Ok(())
    }

    fn print_sources(&self, sources: &[RagSourceRef]) {
        if !self.sources || sources.is_empty() {
            return;
        }
        println!();
        println!("Sources:");
        for source in sources {
            println!("  [{:.3}] {} ({})", source.score, source.source, source.location);
        }
    }
}
