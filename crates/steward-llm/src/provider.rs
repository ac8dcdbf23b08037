//! Inference provider trait
//!
//! The seam between the resilience pipeline and the hosted API. The
//! concrete HTTP implementation lives in [`crate::gemini`]; tests use
//! [`MockProvider`].

use crate::config::GenerationParams;
use crate::error::Result;

/// A single generated completion with usage metadata when the API reports it
#[derive(Debug, Clone)]
pub struct GeneratedText {
    /// Response text
    pub text: String,
    /// Prompt tokens, if reported
    pub input_tokens: Option<u32>,
    /// Completion tokens, if reported
    pub output_tokens: Option<u32>,
}

/// Trait for inference providers
#[async_trait::async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Generate a completion for a prompt
    async fn generate_content(
        &self,
        model: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<GeneratedText>;

    /// Count tokens for a prompt
    async fn count_tokens(&self, model: &str, prompt: &str) -> Result<u32>;
}

/// A mock provider that returns queued outcomes, for tests
pub struct MockProvider {
    outcomes: std::sync::Mutex<std::collections::VecDeque<Result<GeneratedText>>>,
    calls: std::sync::atomic::AtomicU32,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a mock with an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self {
            outcomes: std::sync::Mutex::new(std::collections::VecDeque::new()),
            calls: std::sync::atomic::AtomicU32::new(0),
        }
    }

    /// Queue a successful response
    pub fn push_text(&self, text: impl Into<String>) {
        self.push(Ok(GeneratedText {
            text: text.into(),
            input_tokens: Some(10),
            output_tokens: Some(5),
        }));
    }

    /// Queue an arbitrary outcome
    pub fn push(&self, outcome: Result<GeneratedText>) {
        self.outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(outcome);
    }

    /// Number of `generate_content` calls observed
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl InferenceProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate_content(
        &self,
        _model: &str,
        _prompt: &str,
        _params: &GenerationParams,
    ) -> Result<GeneratedText> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let queued = self
            .outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match queued {
            Some(outcome) => outcome,
            None => Ok(GeneratedText {
                text: "mock response".to_string(),
                input_tokens: Some(10),
                output_tokens: Some(5),
            }),
        }
    }

    async fn count_tokens(&self, _model: &str, prompt: &str) -> Result<u32> {
        Ok((prompt.len() / 4) as u32)
    }
}
