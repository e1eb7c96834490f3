//! Command handlers for the ConvoPilot CLI.

pub mod ask;
pub mod clean;
pub mod index;
pub mod stats;

pub use ask::AskCommand;
pub use clean::CleanCommand;
pub use index::IndexCommand;
pub use stats::StatsCommand;

use convopilot_core::{config::AppConfig, AppResult};
use convopilot_knowledge::{config as kb_config, DirectorySource, DocumentSource, KnowledgeBase};
use std::path::Path;
use std::sync::Arc;

/// Open the workspace knowledge base, reading documents from `source_dir`
/// or the configured source directory.
pub(crate) async fn open_knowledge_base(
    config: &AppConfig,
    source_dir: Option<&Path>,
) -> AppResult<KnowledgeBase> {
    let mut kb = kb_config::load_config(&config.workspace)?;
    kb.embedding = kb.embedding.with_overrides(
        config.embedding_provider.as_deref(),
        config.embedding_model.as_deref(),
    );

    let dir = source_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.resolved_source_dir());
    tracing::debug!("Document source: {:?}", dir);

    let source: Arc<dyn DocumentSource> = Arc::new(DirectorySource::new(dir));
    KnowledgeBase::open_with_config(&config.workspace, kb, source).await
}
