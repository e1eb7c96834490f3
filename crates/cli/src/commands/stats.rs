//! Stats command handler.
//!
//! Shows statistics of the persisted index without building it.

use clap::Args;
use convopilot_core::{config::AppConfig, AppResult};
use convopilot_knowledge::{config::get_index_path, index_stats, IndexStorage, SqliteIndexStorage};

/// Show index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let storage = SqliteIndexStorage::new(get_index_path(&config.workspace));
        if !storage.exists() {
            println!("No index yet. Run 'convopilot index' or ask a question to build one.");
            return Ok(());
        }

        let stats = index_stats(&storage)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Model:      {}", stats.model);
            println!("Metric:     {}", stats.metric.as_str());
            println!("Documents:  {}", stats.documents_count);
            println!("Chunks:     {}", stats.chunks_count);
            println!("Built at:   {}", stats.built_at.to_rfc3339());
            println!("Size:       {} bytes", stats.storage_bytes);
        }

        Ok(())
    }
}
