// src/llm/fallback.rs
//! Retry and fallback execution strategy over prioritized model chains.
//!
//! Callers pick a [`ModelTier`]; this module absorbs provider instability
//! (quota exhaustion, transient unavailability) by retrying with exponential
//! back-off and falling over to the next model in the tier's chain. A
//! non-transient failure propagates immediately: it means the request itself
//! is wrong, and no amount of retrying will fix it.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::error::{LlmError, ProviderError};

/// Default number of attempts per model before advancing down the chain.
pub const MAX_RETRIES_PER_MODEL: u32 = 3;

const BACKOFF_BASE_MS: u64 = 1_000;
const BACKOFF_CAP_MS: u64 = 30_000;

/// The generative call boundary: one prompt in, one text response out.
///
/// The pipeline depends only on this signature; the concrete HTTP client
/// lives in `services::gemini` and tests substitute scripted fakes.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ProviderError>;
}

/// Named capability/cost classes mapped to ordered model chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// Cheap and fast; field extraction.
    Light,
    /// Mid-sized; roadmap generation.
    Medium,
    /// Largest available; ATS evaluation.
    Heavy,
}

/// Process-wide fallback configuration: one ordered, non-empty model chain
/// per tier. Resolved once at startup and passed explicitly; read-only at
/// run time.
#[derive(Debug, Clone)]
pub struct ModelChains {
    light: Vec<String>,
    medium: Vec<String>,
    heavy: Vec<String>,
}

impl ModelChains {
    pub fn new(light: Vec<String>, medium: Vec<String>, heavy: Vec<String>) -> Self {
        Self {
            light,
            medium,
            heavy,
        }
    }

    /// Reads `GEMINI_MODELS_{LIGHT,MEDIUM,HEAVY}` as comma-separated lists,
    /// falling back to the stock Gemma chains.
    pub fn from_env() -> Self {
        Self {
            light: chain_from_env("GEMINI_MODELS_LIGHT", &["gemma-3-4b-it", "gemma-3-12b-it"]),
            medium: chain_from_env("GEMINI_MODELS_MEDIUM", &["gemma-3-12b-it", "gemma-3-4b-it"]),
            heavy: chain_from_env("GEMINI_MODELS_HEAVY", &["gemma-3-27b-it", "gemma-3-12b-it"]),
        }
    }

    pub fn chain(&self, tier: ModelTier) -> &[String] {
        match tier {
            ModelTier::Light => &self.light,
            ModelTier::Medium => &self.medium,
            ModelTier::Heavy => &self.heavy,
        }
    }
}

fn chain_from_env(key: &str, default: &[&str]) -> Vec<String> {
    let parsed: Vec<String> = env::var(key)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if parsed.is_empty() {
        default.iter().map(|s| s.to_string()).collect()
    } else {
        parsed
    }
}

/// Exponential back-off with a ceiling: `min(base * 2^(attempt-1), cap)`.
fn backoff_delay(attempt: u32) -> Duration {
    let exp = BACKOFF_BASE_MS.saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)));
    Duration::from_millis(exp.min(BACKOFF_CAP_MS))
}

/// Executes `prompt` against `chain` in priority order.
///
/// Each model gets up to `max_retries_per_model` attempts; transient
/// failures back off and retry, then advance to the next model. The first
/// success short-circuits. A non-transient failure propagates immediately
/// without retrying or falling back.
pub async fn invoke_with_fallback(
    backend: &dyn GenerativeBackend,
    chain: &[String],
    prompt: &str,
    max_retries_per_model: u32,
) -> Result<String, LlmError> {
    let mut attempts_total = 0;
    let mut last = ProviderError::RequestFailed("no models in chain".to_string());

    for (position, model) in chain.iter().enumerate() {
        for attempt in 1..=max_retries_per_model {
            attempts_total += 1;
            match backend.generate(model, prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() => {
                    if attempt < max_retries_per_model {
                        let delay = backoff_delay(attempt);
                        warn!(
                            model = %model,
                            attempt = attempt,
                            max_retries = max_retries_per_model,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Transient model failure, retrying after back-off"
                        );
                        tokio::time::sleep(delay).await;
                    } else if position + 1 < chain.len() {
                        warn!(
                            model = %model,
                            next_model = %chain[position + 1],
                            error = %e,
                            "Model retries exhausted, falling back to next model"
                        );
                    }
                    last = e;
                }
                Err(e) => return Err(LlmError::Provider(e)),
            }
        }
    }

    Err(LlmError::AllModelsExhausted {
        attempts: attempts_total,
        last,
    })
}
