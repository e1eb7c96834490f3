//! Ollama embedding provider.
//!
//! Calls the batch `/api/embed` endpoint of a local Ollama server
//! (`nomic-embed-text` and similar models). Requests are retried with
//! exponential backoff and every returned vector is checked against the
//! configured dimensions, since a silent model swap would make the index and
//! the query embeddings incomparable.

use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use convopilot_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBED_ENDPOINT: &str = "/api/embed";

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 100;
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Ollama embedding provider using the local HTTP API.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create a provider and verify the server answers with the expected dimensions.
    ///
    /// The endpoint comes from the config, then `OLLAMA_URL`, then the local default.
    ///
    /// With `detect_dimensions` set, the dimensions of the first response are
    /// adopted instead of checked.
    pub async fn new(config: EmbeddingConfig) -> AppResult<Self> {
        let mut provider = Self::unverified(&config)?;
        if config.detect_dimensions {
            provider.dimensions = provider.detect_dimensions().await?;
        } else {
            provider.verify_connection().await?;
        }
        Ok(provider)
    }

    fn unverified(config: &EmbeddingConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                AppError::Embedding(format!("Failed to create HTTP client for Ollama: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: resolve_base_url(config.endpoint.as_deref()),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    #[instrument(skip(self), fields(model = %self.model))]
    async fn verify_connection(&self) -> AppResult<()> {
        debug!("Verifying Ollama connection at {}", self.base_url);

        match self
            .embed_with_retries(&["connection check".to_string()])
            .await
        {
            Ok(_) => {
                debug!("Ollama model '{}' ready", self.model);
                Ok(())
            }
            Err(AppError::Embedding(msg)) if msg.contains("dimensions") => {
                Err(AppError::Embedding(msg))
            }
            Err(e) => Err(AppError::Embedding(format!(
                "Ollama not available at {} ({}). Ensure Ollama is running and run: ollama pull {}",
                self.base_url, e, self.model
            ))),
        }
    }

    #[instrument(skip(self), fields(model = %self.model))]
    async fn detect_dimensions(&self) -> AppResult<usize> {
        debug!("Detecting embedding dimensions at {}", self.base_url);

        let vectors = self
            .request_embeddings(&["dimension check".to_string()], None)
            .await
            .map_err(|e| {
                AppError::Embedding(format!(
                    "Ollama not available at {} ({}). Ensure Ollama is running and run: ollama pull {}",
                    self.base_url, e, self.model
                ))
            })?;

        match vectors.first().map(Vec::len) {
            Some(dimensions) if dimensions > 0 => {
                debug!("Ollama model '{}' has {} dimensions", self.model, dimensions);
                Ok(dimensions)
            }
            _ => Err(AppError::Embedding(format!(
                "Ollama model '{}' returned an empty embedding",
                self.model
            ))),
        }
    }

    async fn embed_with_retries(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut attempt = 0;

        loop {
            match self.embed_request(texts).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e) => {
                    attempt += 1;
                    if attempt >= MAX_RETRIES {
                        return Err(e);
                    }

                    let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                    warn!(
                        "Embedding request failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt, MAX_RETRIES, backoff_ms, e
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }

    async fn embed_request(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.request_embeddings(texts, Some(self.dimensions)).await
    }

    /// One `/api/embed` call; `dimensions` of `None` accepts any vector length.
    #[instrument(skip(self, texts), fields(batch = texts.len()))]
    async fn request_embeddings(
        &self,
        texts: &[String],
        dimensions: Option<usize>,
    ) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}{}", self.base_url, EMBED_ENDPOINT);
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to send request to Ollama: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to read Ollama response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(AppError::Embedding(format!(
                "Ollama API error ({}): {}",
                status, message
            )));
        }

        parse_embeddings(&body, texts.len(), dimensions)
    }
}

fn resolve_base_url(endpoint: Option<&str>) -> String {
    endpoint
        .map(str::to_string)
        .or_else(|| std::env::var("OLLAMA_URL").ok())
        .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
        .trim_end_matches('/')
        .to_string()
}

fn parse_embeddings(
    body: &str,
    expected: usize,
    dimensions: Option<usize>,
) -> AppResult<Vec<Vec<f32>>> {
    let parsed: EmbedResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Embedding(format!("Failed to parse Ollama response: {}", e)))?;

    if parsed.embeddings.len() != expected {
        return Err(AppError::Embedding(format!(
            "Ollama returned {} embeddings for {} inputs",
            parsed.embeddings.len(),
            expected
        )));
    }

    if let Some(dimensions) = dimensions {
        if let Some(bad) = parsed.embeddings.iter().find(|e| e.len() != dimensions) {
            return Err(AppError::Embedding(format!(
                "Unexpected embedding dimensions: got {}, expected {}",
                bad.len(),
                dimensions
            )));
        }
    }

    Ok(parsed.embeddings)
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        // Blank texts get a zero vector locally; the API rejects empty input.
        let pending: Vec<(usize, String)> = texts
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.trim().is_empty())
            .map(|(i, t)| (i, t.clone()))
            .collect();

        let mut embeddings = vec![vec![0.0; self.dimensions]; texts.len()];
        if pending.is_empty() {
            return Ok(embeddings);
        }

        let inputs: Vec<String> = pending.iter().map(|(_, t)| t.clone()).collect();
        let vectors = self.embed_with_retries(&inputs).await?;

        for ((i, _), vector) in pending.into_iter().zip(vectors) {
            embeddings[i] = vector;
        }

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 3,
            endpoint: Some("http://127.0.0.1:9/".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_explicit_endpoint_wins() {
        assert_eq!(
            resolve_base_url(Some("http://gpu-box:11434/")),
            "http://gpu-box:11434"
        );
    }

    #[test]
    fn test_request_shape() {
        let input = vec!["a".to_string(), "b".to_string()];
        let request = EmbedRequest {
            model: "nomic-embed-text",
            input: &input,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"model": "nomic-embed-text", "input": ["a", "b"]})
        );
    }

    #[test]
    fn test_parse_embeddings() {
        let body = r#"{"model":"m","embeddings":[[0.1,0.2,0.3],[0.4,0.5,0.6]]}"#;
        let parsed = parse_embeddings(body, 2, Some(3)).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1], vec![0.4, 0.5, 0.6]);
    }

    #[test]
    fn test_parse_rejects_wrong_dimensions() {
        let body = r#"{"embeddings":[[0.1,0.2]]}"#;
        let err = parse_embeddings(body, 1, Some(3)).unwrap_err();
        assert!(err.to_string().contains("dimensions"));
    }

    #[test]
    fn test_parse_rejects_count_mismatch() {
        let body = r#"{"embeddings":[[0.1,0.2,0.3]]}"#;
        assert!(parse_embeddings(body, 2, Some(3)).is_err());
    }

    #[test]
    fn test_parse_accepts_any_dimensions_when_detecting() {
        let body = r#"{"embeddings":[[0.1,0.2,0.3,0.4,0.5]]}"#;
        let parsed = parse_embeddings(body, 1, None).unwrap();
        assert_eq!(parsed[0].len(), 5);
    }

    #[tokio::test]
    async fn test_detection_against_unreachable_server_is_embedding_error() {
        let config = EmbeddingConfig {
            detect_dimensions: true,
            ..test_config()
        };
        let result = OllamaProvider::new(config).await;
        assert!(matches!(result, Err(AppError::Embedding(_))));
    }

    #[tokio::test]
    async fn test_blank_batch_needs_no_server() {
        let provider = OllamaProvider::unverified(&test_config()).unwrap();
        let embeddings = provider
            .embed_batch(&["".to_string(), "   ".to_string()])
            .await
            .unwrap();

        assert_eq!(embeddings, vec![vec![0.0; 3], vec![0.0; 3]]);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_embedding_error() {
        let result = OllamaProvider::new(test_config()).await;
        assert!(matches!(result, Err(AppError::Embedding(_))));
    }
}
