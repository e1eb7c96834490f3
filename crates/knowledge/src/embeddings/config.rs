//! Embedding backend configuration.

use crate::types::ModelIdentity;
use serde::{Deserialize, Serialize};

/// Embedding settings, stored under `embedding:` in the knowledge config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram" or "ollama"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier (provider-specific)
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding vector dimensions
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Maximum number of texts sent to the provider at once
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Provider endpoint, for HTTP-backed providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Take `dimensions` from the provider's first response instead of the file
    #[serde(skip)]
    pub detect_dimensions: bool,
}

fn default_provider() -> String {
    "trigram".to_string()
}

fn default_model() -> String {
    "trigram-v1".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_batch_size() -> usize {
    64
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            dimensions: default_dimensions(),
            batch_size: default_batch_size(),
            endpoint: None,
            detect_dimensions: false,
        }
    }
}

impl EmbeddingConfig {
    /// Identity recorded in indexes built with this configuration.
    pub fn identity(&self) -> ModelIdentity {
        ModelIdentity {
            provider: self.provider.clone(),
            model: self.model.clone(),
            dimensions: self.dimensions,
        }
    }

    /// Apply provider/model overrides from the global configuration.
    ///
    /// Switching to Ollama without naming a model selects its usual embedding
    /// model and dimensions rather than keeping the trigram ones. Naming a
    /// different Ollama model leaves its dimensions to be detected.
    pub fn with_overrides(mut self, provider: Option<&str>, model: Option<&str>) -> Self {
        if let Some(provider) = provider {
            if provider != self.provider {
                self.provider = provider.to_string();
                if provider == "ollama" && model.is_none() {
                    self.model = "nomic-embed-text".to_string();
                    self.dimensions = 768;
                } else if provider == "trigram" && model.is_none() {
                    self.model = default_model();
                    self.dimensions = default_dimensions();
                }
            }
        }

        if let Some(model) = model {
            if self.provider == "ollama" && model != self.model {
                self.detect_dimensions = true;
            }
            self.model = model.to_string();
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "trigram");
        assert_eq!(config.model, "trigram-v1");
        assert_eq!(config.dimensions, 384);
        assert_eq!(config.batch_size, 64);
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn test_identity() {
        let identity = EmbeddingConfig::default().identity();
        assert_eq!(identity.provider, "trigram");
        assert_eq!(identity.dimensions, 384);
        assert_eq!(identity.to_string(), "trigram/trigram-v1 (384 dims)");
    }

    #[test]
    fn test_switch_to_ollama_picks_embedding_model() {
        let config = EmbeddingConfig::default().with_overrides(Some("ollama"), None);
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "nomic-embed-text");
        assert_eq!(config.dimensions, 768);
    }

    #[test]
    fn test_ollama_with_named_model_detects_dimensions() {
        let config =
            EmbeddingConfig::default().with_overrides(Some("ollama"), Some("mxbai-embed-large"));
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "mxbai-embed-large");
        assert!(config.detect_dimensions);
    }

    #[test]
    fn test_same_ollama_model_keeps_file_dimensions() {
        let file = EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            ..Default::default()
        };
        let config = file.with_overrides(None, Some("nomic-embed-text"));
        assert_eq!(config.dimensions, 768);
        assert!(!config.detect_dimensions);
    }

    #[test]
    fn test_model_override_only() {
        let config = EmbeddingConfig::default().with_overrides(None, Some("trigram-v2"));
        assert_eq!(config.provider, "trigram");
        assert_eq!(config.model, "trigram-v2");
        assert_eq!(config.dimensions, 384);
        assert!(!config.detect_dimensions);
    }

    #[test]
    fn test_partial_yaml() {
        let config: EmbeddingConfig =
            serde_yaml::from_str("provider: ollama\nmodel: mxbai-embed-large\ndimensions: 1024\n")
                .unwrap();
        assert_eq!(config.model, "mxbai-embed-large");
        assert_eq!(config.dimensions, 1024);
        assert_eq!(config.batch_size, 64);
    }
}
