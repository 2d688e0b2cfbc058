//! Stats command handler.
//!
//! Shows the state of the index and the document store.

use super::print_json;
use clap::Args;
use lexora_core::AppResult;
use lexora_knowledge::RagEngine;

/// Show index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// List every indexed document
    #[arg(short, long)]
    pub detailed: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, engine: &RagEngine) -> AppResult<()> {
        tracing::info!("Executing stats command");
        tracing::debug!("Stats options: {:?}", self);

        let stats = engine.stats().await?;

        if self.json {
            return print_json(&stats);
        }

        println!("Index:           {:?}", stats.status);
        println!("Records:         {}", stats.records);
        println!(
            "Documents:       {} indexed, {} on storage",
            stats.indexed_sources.len(),
            stats.documents_on_storage
        );
        println!("Embedding space: {}", stats.embedding_space);
        println!("Documents dir:   {}", stats.documents_dir.display());
        println!("Index dir:       {}", stats.index_dir.display());
        if let Some(saved_at) = stats.saved_at {
            println!("Last saved:      {}", saved_at.to_rfc3339());
        }

        if self.detailed {
            for source in &stats.indexed_sources {
                println!("  {}", source);
            }
        }

        Ok(())
    }
}
