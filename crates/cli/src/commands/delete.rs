//! Delete command handler.
//!
//! Removes a document from the store and rebuilds the index without it.

use super::{print_json, print_report};
use clap::Args;
use lexora_core::AppResult;
use lexora_knowledge::RagEngine;

/// Delete a document and rebuild the index
#[derive(Args, Debug)]
pub struct DeleteCommand {
    /// Document name as shown by `lexora list`
    pub name: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl DeleteCommand {
    pub async fn execute(&self, engine: &RagEngine) -> AppResult<()> {
        tracing::info!("Executing delete command for '{}'", self.name);

        let report = engine.remove_document(&self.name).await?;

        if self.json {
            let output = serde_json::json!({
                "deleted": self.name,
                "report": report,
            });
            return print_json(&output);
        }

        println!("Deleted {}", self.name);
        print_report(&report);
        Ok(())
    }
}
