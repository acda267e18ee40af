// Resume feedback: prompt construction, the single model call, and reply normalization.
// All model calls go through llm_client::CompletionModel.

pub mod handlers;
pub mod normalizer;
pub mod prompts;

use std::sync::Arc;

use tracing::debug;

use crate::llm_client::{CompletionModel, LlmError};
use normalizer::{normalize, FeedbackResult};
use prompts::build_prompt;

/// Turns extracted resume text into a four-field `FeedbackResult`.
///
/// A failed model call is an error; a malformed reply is not.
#[derive(Clone)]
pub struct FeedbackNormalizer {
    model: Arc<dyn CompletionModel>,
}

impl FeedbackNormalizer {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }

    /// Prompt → one model call → normalized result.
    pub async fn review(&self, resume_text: &str) -> Result<FeedbackResult, LlmError> {
        let prompt = build_prompt(resume_text);
        let raw = self.request_completion(&prompt).await?;
        Ok(normalize(&raw))
    }

    /// Single outbound call. Errors propagate unchanged.
    pub async fn request_completion(&self, prompt: &str) -> Result<String, LlmError> {
        let raw = self.model.complete(prompt).await?;
        debug!("Raw model reply: {raw}");
        Ok(raw)
    }
}
