//! Index command handler.
//!
//! Rebuilds the vector index from the document source.

use super::open_knowledge_base;
use clap::Args;
use convopilot_core::{config::AppConfig, AppResult};
use convopilot_knowledge::{ProgressEvent, ProgressReporter};
use std::path::PathBuf;
use std::sync::Arc;

/// Rebuild the document index
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// Directory to read documents from (overrides the configured source)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index command");

        let mut kb = open_knowledge_base(config, self.source.as_deref()).await?;
        if !self.json {
            kb = kb.with_progress(ProgressReporter::new(Arc::new(|event: ProgressEvent| {
                eprintln!("{}", event.format_simple());
            })));
        }

        let stats = kb.build().await?;

        if self.json {
            let output = serde_json::json!({
                "documentsIndexed": stats.documents_indexed,
                "documentsSkipped": stats.documents_skipped,
                "chunksIndexed": stats.chunks_indexed,
                "bytesProcessed": stats.bytes_processed,
                "durationSecs": stats.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Indexed {} documents ({} chunks, {} bytes, {} skipped) in {:.2}s",
                stats.documents_indexed,
                stats.chunks_indexed,
                stats.bytes_processed,
                stats.documents_skipped,
                stats.duration_secs
            );
        }

        Ok(())
    }
}
