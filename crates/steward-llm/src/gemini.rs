//! Gemini HTTP provider
//!
//! Minimal `generateContent`/`countTokens` client over reqwest. The API key
//! travels in the `x-goog-api-key` header and never appears in error text
//! or logs.

use crate::config::GenerationParams;
use crate::error::{Error, Result};
use crate::provider::{GeneratedText, InferenceProvider};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Characters of an upstream error body kept in error messages
const ERROR_BODY_PREVIEW: usize = 200;

/// Configuration for the Gemini provider
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key
    pub api_key: String,
    /// Base URL, overridable for tests and proxies
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Create a config for the public API endpoint
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Override the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: WireGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Serialize)]
struct CountTokensRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountTokensResponse {
    total_tokens: u32,
}

// ============================================================================
// Provider
// ============================================================================

/// Gemini inference provider
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Config("Gemini API key is required".into()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    async fn post_json<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        model: &str,
        method: &str,
        body: &Req,
    ) -> Result<Resp> {
        let url = format!("{}/models/{}:{}", self.config.base_url, model, method);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            return Err(Error::Api {
                status: Some(status.as_u16()),
                message: preview,
            });
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}

/// Map reqwest failures into the client taxonomy
fn map_reqwest_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        // Millisecond figure is unknown here; the façade enforces its own
        // per-attempt deadline on top of the reqwest timeout.
        Error::Network("request timed out".to_string())
    } else if e.is_connect() {
        Error::Network(format!("connection refused: {e}"))
    } else {
        Error::Network(e.to_string())
    }
}

#[async_trait::async_trait]
impl InferenceProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate_content(
        &self,
        model: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<GeneratedText> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: WireGenerationConfig {
                temperature: params.temperature,
                top_p: params.top_p,
                top_k: params.top_k,
                max_output_tokens: params.max_output_tokens,
            },
        };

        let response: GenerateResponse =
            self.post_json(model, "generateContent", &request).await?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::InvalidResponse("no candidates in response".into()))?;

        let (input_tokens, output_tokens) = response
            .usage_metadata
            .map(|u| (u.prompt_token_count, u.candidates_token_count))
            .unwrap_or((None, None));

        debug!(
            model = model,
            input_tokens = ?input_tokens,
            output_tokens = ?output_tokens,
            "Gemini generation complete"
        );

        Ok(GeneratedText {
            text,
            input_tokens,
            output_tokens,
        })
    }

    async fn count_tokens(&self, model: &str, prompt: &str) -> Result<u32> {
        let request = CountTokensRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };
        let response: CountTokensResponse = self.post_json(model, "countTokens", &request).await?;
        Ok(response.total_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_rejected() {
        let result = GeminiProvider::new(GeminiConfig::new(""));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_request_serialization_is_camel_case() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "hello".into(),
                }],
            }],
            generation_config: WireGenerationConfig {
                temperature: 0.7,
                top_p: 0.95,
                top_k: 40,
                max_output_tokens: 1024,
            },
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("generationConfig"));
        assert!(json.contains("maxOutputTokens"));
        assert!(json.contains("topP"));
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "candidates": [{"content": {"parts": [{"text": "hi "}, {"text": "there"}]}}],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2}
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.candidates.len(), 1);
        let usage = parsed.usage_metadata.unwrap();
        assert_eq!(usage.prompt_token_count, Some(4));
        assert_eq!(usage.candidates_token_count, Some(2));
    }
}
