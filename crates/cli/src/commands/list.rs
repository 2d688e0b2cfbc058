//! List command handler.

use super::print_json;
use clap::Args;
use lexora_core::AppResult;
use lexora_knowledge::RagEngine;
use std::collections::BTreeSet;

/// List uploaded documents
#[derive(Args, Debug)]
pub struct ListCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ListCommand {
    pub async fn execute(&self, engine: &RagEngine) -> AppResult<()> {
        tracing::info!("Executing list command");

        let documents = engine.documents().list()?;
        let indexed: BTreeSet<String> = engine.stats().await?.indexed_sources.into_iter().collect();

        if self.json {
            let output: Vec<_> = documents
                .iter()
                .map(|doc| {
                    serde_json::json!({
                        "name": doc.name,
                        "type": doc.document_type,
                        "sizeBytes": doc.size_bytes,
                        "modified": doc.modified,
                        "indexed": indexed.contains(&doc.name),
                    })
                })
                .collect();
            return print_json(&output);
        }

        if documents.is_empty() {
            println!("No documents in {}", engine.documents().dir().display());
            return Ok(());
        }

        for doc in &documents {
            let marker = if indexed.contains(&doc.name) { "*" } else { " " };
            println!(
                "{} {:<40} {:>6} {:>10} bytes",
                marker,
                doc.name,
                doc.document_type.as_str(),
                doc.size_bytes
            );
        }
        println!("{} documents (* = indexed)", documents.len());

        Ok(())
    }
}
