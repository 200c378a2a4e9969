// src/llm/error.rs
//! Error taxonomy for the LLM generation pipeline.

use thiserror::Error;

/// Failure classification at the generative call boundary.
///
/// `RateLimited` and `ServiceUnavailable` are infrastructure flakiness and
/// eligible for retry/fallback; everything else signals a caller or
/// configuration problem and propagates immediately.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Model service unavailable (HTTP {status})")]
    ServiceUnavailable { status: u16 },

    #[error("API key not configured")]
    NotConfigured,

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// True for failures worth retrying or falling back on.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited | ProviderError::ServiceUnavailable { .. }
        )
    }
}

/// Pipeline stage, used to label which generation task failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extraction,
    Evaluation,
    Roadmap,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Extraction => write!(f, "extraction"),
            Stage::Evaluation => write!(f, "evaluation"),
            Stage::Roadmap => write!(f, "roadmap"),
        }
    }
}

/// Errors produced by the structured generation pipeline.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("No JSON object found in model response")]
    NoJsonFound,

    #[error("Response could not be parsed as JSON: {0}")]
    UnrecoverableFormat(#[source] serde_json::Error),

    #[error("Extracted data is incomplete")]
    IncompleteExtraction,

    #[error("All models exhausted after {attempts} attempts: {last}")]
    AllModelsExhausted {
        attempts: u32,
        #[source]
        last: ProviderError,
    },

    #[error("{stage} generation failed: {source}")]
    GenerationFailed {
        stage: Stage,
        #[source]
        source: Box<LlmError>,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
