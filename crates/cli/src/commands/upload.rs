//! Upload command handler.
//!
//! Copies a file into the document store and adds it to the index.

use super::{print_json, print_report};
use clap::Args;
use lexora_core::AppResult;
use lexora_knowledge::{IndexOutcome, RagEngine};
use std::path::PathBuf;

/// Upload a document and index it
#[derive(Args, Debug)]
pub struct UploadCommand {
    /// File to upload (.pdf, .docx, .txt, .md)
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl UploadCommand {
    pub async fn execute(&self, engine: &RagEngine) -> AppResult<()> {
        tracing::info!("Executing upload command");
        tracing::debug!("Upload options: {:?}", self);

        let outcome = engine.upload(&self.file).await?;

        if self.json {
            return print_json(&outcome);
        }

        match &outcome {
            IndexOutcome::Indexed {
                source,
                chunks,
                total_records,
            } => println!(
                "Uploaded {} ({} chunks, {} in index)",
                source, chunks, total_records
            ),
            IndexOutcome::Rebuilt { source, report } => {
                println!("Replaced {}; index rebuilt", source);
                print_report(report);
            }
            IndexOutcome::Skipped { source, reason } => {
                println!("Uploaded {} but it was not indexed: {}", source, reason)
            }
        }

        Ok(())
    }
}
