//! Command handlers for the Lexora CLI.
//!
//! Each subcommand lives in its own module and drives the shared
//! [`lexora_knowledge::RagEngine`].

pub mod ask;
pub mod delete;
pub mod list;
pub mod reindex;
pub mod stats;
pub mod upload;

pub use ask::AskCommand;
pub use delete::DeleteCommand;
pub use list::ListCommand;
pub use reindex::ReindexCommand;
pub use stats::StatsCommand;
pub use upload::UploadCommand;

use lexora_core::{AppError, AppResult};
use lexora_knowledge::ReindexReport;
use serde::Serialize;

/// Pretty-print a value as JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> AppResult<()> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| AppError::Serialization(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

/// Human-readable summary of a full rebuild.
pub(crate) fn print_report(report: &ReindexReport) {
    println!(
        "Indexed {} of {} documents ({} chunks) in {:.2}s",
        report.indexed.len(),
        report.documents,
        report.records,
        report.duration_secs
    );
    for skipped in &report.skipped {
        println!("  skipped {}: {}", skipped.source, skipped.reason);
    }
}
