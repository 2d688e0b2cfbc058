//! Reindex command handler.

use super::{print_json, print_report};
use clap::Args;
use lexora_core::AppResult;
use lexora_knowledge::RagEngine;

/// Rebuild the index from every uploaded document
#[derive(Args, Debug)]
pub struct ReindexCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ReindexCommand {
    pub async fn execute(&self, engine: &RagEngine) -> AppResult<()> {
        tracing::info!("Executing reindex command");

        let report = engine.reindex_all().await?;

        if self.json {
            print_json(&report)
        } else {
            print_report(&report);
            Ok(())
        }
    }
}
