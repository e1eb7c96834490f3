//! Clean command handler.

use clap::Args;
use convopilot_core::{config::AppConfig, AppResult};
use convopilot_knowledge::{config::get_index_path, IndexStorage, SqliteIndexStorage};

/// Delete the persisted index; the next question rebuilds it
#[derive(Args, Debug)]
pub struct CleanCommand {}

impl CleanCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing clean command");

        let storage = SqliteIndexStorage::new(get_index_path(&config.workspace));
        if !storage.exists() {
            println!("No index to remove at {}", storage.location().display());
            return Ok(());
        }

        storage.remove()?;
        println!("Index removed from {}", storage.location().display());
        Ok(())
    }
}
