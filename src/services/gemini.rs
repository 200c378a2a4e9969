// src/services/gemini.rs
//! HTTP client for the Google Generative Language API.
//!
//! Implements the pipeline's [`GenerativeBackend`] boundary: one model id
//! and one prompt in, the concatenated candidate text out. HTTP status codes
//! are classified into the pipeline's transient/non-transient taxonomy here,
//! so the retry/fallback strategy never sees reqwest types.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, error, info};

use crate::llm::{GenerativeBackend, ProviderError};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug)]
pub struct GeminiService {
    config: GeminiConfig,
    client: Client,
}

impl GeminiService {
    pub fn new(config: GeminiConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(180))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { config, client }
    }

    /// Build from `GEMINI_API_KEY` / `GEMINI_BASE_URL`. Fails when no API
    /// key is present so the misconfiguration surfaces at startup, not on
    /// the first upload.
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(ProviderError::NotConfigured)?;
        let base_url = env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self::new(GeminiConfig { api_key, base_url }))
    }

    async fn generate_content(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        debug!(model = %model, prompt_len = prompt.len(), "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }

        if status.is_server_error() {
            return Err(ProviderError::ServiceUnavailable {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Gemini API request failed");
            return Err(ProviderError::RequestFailed(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let parsed = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let text: String = parsed
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "No candidate text in response".to_string(),
            ));
        }

        info!(model = %model, response_len = text.len(), "Gemini generation completed");
        Ok(text)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiService {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        self.generate_content(model, prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape_matches_api() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "hello".to_string(),
                }],
            }],
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
    }

    #[test]
    fn response_text_extraction_tolerates_missing_fields() {
        let raw = r#"{"candidates": [{"content": {"parts": [{"text": "a"}, {"text": "b"}]}}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let text: String = parsed
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        assert_eq!(text, "ab");

        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.candidates.is_empty());
    }
}
