//! Ask command handler.
//!
//! Validates the question, answers it from the index and optionally saves the
//! matched document.

use super::open_knowledge_base;
use clap::Args;
use convopilot_core::{config::AppConfig, error::FALLBACK_MESSAGE, AppError, AppResult};
use std::path::PathBuf;

/// Reply for questions too short to search for.
pub const UNCLEAR_QUESTION: &str = "I couldn't understand that. Please ask a clear question.";

const MIN_QUESTION_CHARS: usize = 3;

/// Ask a question about the indexed documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Maximum accepted distance (default from knowledge.yaml)
    #[arg(short, long)]
    pub threshold: Option<f32>,

    /// Write the full matched document to this file
    #[arg(long)]
    pub save_document: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let Some(question) = validate_question(&self.question) else {
            tracing::debug!("Rejected question {:?}", self.question);
            println!("{}", UNCLEAR_QUESTION);
            return Ok(());
        };

        if let Some(threshold) = self.threshold {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(AppError::Config(format!(
                    "threshold must be a non-negative number, got {}",
                    threshold
                )));
            }
        }

        let kb = open_knowledge_base(config, None).await?;
        let result = kb.answer(question, self.threshold).await?;

        if let (Some(path), Some(document)) = (&self.save_document, &result.full_document) {
            std::fs::write(path, document)?;
            tracing::info!("Saved matched document to {:?}", path);
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else if result.response.trim().is_empty() {
            println!("{}", FALLBACK_MESSAGE);
        } else {
            println!("{}", result.response);
            if let Some(source) = &result.source {
                println!();
                println!("Source: {}", source);
            }
            if let (Some(path), true) = (&self.save_document, result.is_found()) {
                println!("Document saved to {}", path.display());
            }
        }

        Ok(())
    }
}

/// Trim a question and accept it if at least three characters remain.
pub fn validate_question(question: &str) -> Option<&str> {
    let trimmed = question.trim();
    (trimmed.chars().count() >= MIN_QUESTION_CHARS).then_some(trimmed)
}
