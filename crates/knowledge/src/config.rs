//! Pipeline configuration management.

use crate::types::KnowledgeBaseConfig;
use convopilot_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Load the pipeline configuration.
///
/// Loads from `.convopilot/knowledge.yaml` if it exists, otherwise returns the
/// defaults. The result is always validated.
pub fn load_config(workspace: &Path) -> AppResult<KnowledgeBaseConfig> {
    let config_path = get_config_path(workspace);

    let config = if config_path.exists() {
        let content = fs::read_to_string(&config_path).map_err(|e| {
            AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
        })?;

        let config: KnowledgeBaseConfig = serde_yaml::from_str(&content).map_err(|e| {
            AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
        })?;

        tracing::debug!("Loaded knowledge config from {:?}", config_path);
        config
    } else {
        tracing::debug!("No knowledge config at {:?}, using defaults", config_path);
        KnowledgeBaseConfig::default()
    };

    validate_config(&config)?;
    Ok(config)
}

/// Save the pipeline configuration.
pub fn save_config(workspace: &Path, config: &KnowledgeBaseConfig) -> AppResult<()> {
    validate_config(config)?;

    let config_path = get_config_path(workspace);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }

    let yaml = serde_yaml::to_string(config)?;

    fs::write(&config_path, yaml).map_err(|e| {
        AppError::Config(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Saved knowledge config to {:?}", config_path);
    Ok(())
}

/// Check the invariants the chunker and retriever rely on.
pub fn validate_config(config: &KnowledgeBaseConfig) -> AppResult<()> {
    if config.chunk_size == 0 {
        return Err(AppError::Config("chunk_size must be greater than 0".to_string()));
    }

    if config.chunk_overlap >= config.chunk_size {
        return Err(AppError::Config(format!(
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            config.chunk_overlap, config.chunk_size
        )));
    }

    if config.top_k == 0 {
        return Err(AppError::Config("top_k must be greater than 0".to_string()));
    }

    if !config.score_threshold.is_finite() || config.score_threshold < 0.0 {
        return Err(AppError::Config(format!(
            "score_threshold must be a non-negative number, got {}",
            config.score_threshold
        )));
    }

    if config.embedding.dimensions == 0 {
        return Err(AppError::Config(
            "embedding.dimensions must be greater than 0".to_string(),
        ));
    }

    if config.embedding.batch_size == 0 {
        return Err(AppError::Config(
            "embedding.batch_size must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Get the state directory inside a workspace.
pub fn get_state_dir(workspace: &Path) -> PathBuf {
    workspace.join(".convopilot")
}

/// Get the path to the pipeline config file.
pub fn get_config_path(workspace: &Path) -> PathBuf {
    get_state_dir(workspace).join("knowledge.yaml")
}

/// Get the well-known location of the persisted vector index.
pub fn get_index_path(workspace: &Path) -> PathBuf {
    get_state_dir(workspace).join("vector_index.sqlite")
}
