//! Global configuration for ConvoPilot.
//!
//! Configuration is merged from (lowest to highest precedence):
//! - Built-in defaults
//! - The workspace config file (`.convopilot/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! Pipeline tuning (chunk sizes, thresholds, embedding dimensions) lives in the
//! knowledge crate's own config file; this module only carries what every
//! command needs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Embedding providers the knowledge crate can construct.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["trigram", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .convopilot/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Directory the document source reads from
    pub source_dir: Option<PathBuf>,

    /// Embedding provider override (e.g., "trigram", "ollama")
    pub embedding_provider: Option<String>,

    /// Embedding model override
    pub embedding_model: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub json_logs: bool,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceSection>,
    source: Option<SourceSection>,
    embedding: Option<EmbeddingSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SourceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmbeddingSection {
    provider: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            source_dir: None,
            embedding_provider: None,
            embedding_model: None,
            log_level: None,
            verbose: false,
            no_color: false,
            json_logs: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// Environment variables:
    /// - `CONVOPILOT_WORKSPACE`: Override workspace path
    /// - `CONVOPILOT_CONFIG`: Path to config file
    /// - `CONVOPILOT_SOURCE_DIR`: Directory to read documents from
    /// - `CONVOPILOT_EMBEDDING_PROVIDER`: Embedding provider
    /// - `CONVOPILOT_EMBEDDING_MODEL`: Embedding model
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use convopilot_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], with an explicit workspace and config file
    /// taking precedence over their environment variables.
    ///
    /// Both must be known before the config file is read, so the CLI passes
    /// its `--workspace` and `--config` flags here rather than as overrides.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace
            .or_else(|| std::env::var("CONVOPILOT_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        if let Some(config_file) = config_file
            .or_else(|| std::env::var("CONVOPILOT_CONFIG").ok().map(PathBuf::from))
        {
            config.config_file = Some(config_file);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.workspace.join(".convopilot/config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(dir) = std::env::var("CONVOPILOT_SOURCE_DIR") {
            config.source_dir = Some(PathBuf::from(dir));
        }

        if let Ok(provider) = std::env::var("CONVOPILOT_EMBEDDING_PROVIDER") {
            config.embedding_provider = Some(provider);
        }

        if let Ok(model) = std::env::var("CONVOPILOT_EMBEDDING_MODEL") {
            config.embedding_model = Some(model);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.clone().apply_file(config_file))
    }

    fn apply_file(mut self, file: ConfigFile) -> Self {
        if let Some(path) = file.workspace.and_then(|ws| ws.path) {
            self.workspace = PathBuf::from(path);
        }

        if let Some(path) = file.source.and_then(|s| s.path) {
            let path = PathBuf::from(path);
            // Relative source paths are resolved against the workspace
            self.source_dir = Some(if path.is_relative() {
                self.workspace.join(path)
            } else {
                path
            });
        }

        if let Some(embedding) = file.embedding {
            if embedding.provider.is_some() {
                self.embedding_provider = embedding.provider;
            }
            if embedding.model.is_some() {
                self.embedding_model = embedding.model;
            }
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
            if let Some(json) = logging.json {
                self.json_logs = json;
            }
        }

        self
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        source_dir: Option<PathBuf>,
        embedding_provider: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        json_logs: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(source_dir) = source_dir {
            self.source_dir = Some(source_dir);
        }

        if let Some(provider) = embedding_provider {
            self.embedding_provider = Some(provider);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if json_logs {
            self.json_logs = true;
        }

        self
    }

    /// Get the path to the .convopilot directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(".convopilot")
    }

    /// Ensure the .convopilot directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .convopilot directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Directory documents are read from (defaults to `<workspace>/documents`).
    pub fn resolved_source_dir(&self) -> PathBuf {
        self.source_dir
            .clone()
            .unwrap_or_else(|| self.workspace.join("documents"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> AppResult<()> {
        if let Some(ref provider) = self.embedding_provider {
            if !KNOWN_EMBEDDING_PROVIDERS.contains(&provider.as_str()) {
                return Err(AppError::Config(format!(
                    "Unknown embedding provider: {}. Supported: {}",
                    provider,
                    KNOWN_EMBEDDING_PROVIDERS.join(", ")
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.embedding_provider.is_none());
        assert!(config.source_dir.is_none());
        assert!(!config.verbose);
        assert!(!config.no_color);
        assert!(!config.json_logs);
    }

    #[test]
    fn test_state_dir() {
        let config = AppConfig::default();
        assert!(config.state_dir().ends_with(".convopilot"));
    }

    #[test]
    fn test_with_overrides() {
        let overridden = AppConfig::default().with_overrides(
            None,
            None,
            Some(PathBuf::from("/srv/docs")),
            Some("ollama".to_string()),
            None,
            true,
            false,
            true,
        );

        assert_eq!(overridden.source_dir, Some(PathBuf::from("/srv/docs")));
        assert_eq!(overridden.embedding_provider.as_deref(), Some("ollama"));
        assert!(overridden.verbose);
        assert!(overridden.json_logs);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml_resolves_relative_source() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            "source:\n  path: shared-docs\nembedding:\n  provider: ollama\n  model: nomic-embed-text\nlogging:\n  color: false\n",
        )
        .unwrap();

        let base = AppConfig {
            workspace: temp.path().to_path_buf(),
            ..AppConfig::default()
        };
        let merged = base.merge_yaml(&path).unwrap();

        assert_eq!(merged.source_dir, Some(temp.path().join("shared-docs")));
        assert_eq!(merged.embedding_provider.as_deref(), Some("ollama"));
        assert_eq!(merged.embedding_model.as_deref(), Some("nomic-embed-text"));
        assert!(merged.no_color);
    }

    #[test]
    fn test_load_from_reads_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.yaml");
        std::fs::write(&path, "embedding:\n  provider: ollama\n").unwrap();

        let config =
            AppConfig::load_from(Some(temp.path().to_path_buf()), Some(path.clone())).unwrap();

        assert_eq!(config.workspace, temp.path());
        assert_eq!(config.config_file, Some(path));
        assert_eq!(config.embedding_provider.as_deref(), Some("ollama"));
    }

    #[test]
    fn test_load_from_missing_workspace() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load_from(Some(temp.path().join("nope")), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_resolved_source_dir_default() {
        let config = AppConfig {
            workspace: PathBuf::from("/work"),
            ..AppConfig::default()
        };
        assert_eq!(config.resolved_source_dir(), PathBuf::from("/work/documents"));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let config = AppConfig {
            embedding_provider: Some("unknown".to_string()),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_known_provider() {
        let config = AppConfig {
            embedding_provider: Some("trigram".to_string()),
            ..AppConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
