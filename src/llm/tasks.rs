// src/llm/tasks.rs
//! The three structured generation tasks: field extraction, ATS evaluation,
//! and career roadmap.
//!
//! All three share one pipeline: build a deterministic prompt, invoke the
//! tier's model chain with retry/fallback, isolate the `{...}` payload,
//! repair it into JSON, then apply task-specific post-processing. Failures
//! mean "this task produced no usable result"; the orchestration layer
//! decides whether that is fatal (synchronous extraction) or merely logged
//! (background evaluation/roadmap).

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::error::{LlmError, Stage};
use super::fallback::{
    invoke_with_fallback, GenerativeBackend, ModelChains, ModelTier, MAX_RETRIES_PER_MODEL,
};
use super::prompts;
use super::sanitize::{extract_json_object, repair};

/// The ten breakdown categories summed into the aggregate ATS score.
/// Rubric bounds: experience_quality and role_alignment_score are worth 15,
/// contact_score and education_score 5, everything else 10.
pub const BREAKDOWN_CATEGORIES: [&str; 10] = [
    "section_completeness",
    "contact_score",
    "chronology_score",
    "experience_quality",
    "quantification_score",
    "action_verbs_score",
    "skills_score",
    "readability_score",
    "education_score",
    "role_alignment_score",
];

/// Maximum aggregate ATS score after clamping.
pub const MAX_ATS_SCORE: i64 = 100;

async fn run_task(
    stage: Stage,
    backend: &dyn GenerativeBackend,
    chain: &[String],
    prompt: &str,
) -> Result<Value, LlmError> {
    let raw = invoke_with_fallback(backend, chain, prompt, MAX_RETRIES_PER_MODEL)
        .await
        .map_err(|e| match e {
            exhausted @ LlmError::AllModelsExhausted { .. } => LlmError::GenerationFailed {
                stage,
                source: Box::new(exhausted),
            },
            other => other,
        })?;

    debug!(stage = %stage, response_len = raw.len(), "Model response received");

    let payload = extract_json_object(&raw).map_err(|e| {
        warn!(stage = %stage, "No JSON object found in model response");
        e
    })?;

    repair(&payload)
}

/// Parses raw resume text into the structured résumé object.
///
/// Fails with [`LlmError::IncompleteExtraction`] when the model returns a
/// technically valid but empty object: a résumé with none of name, email,
/// or skills is useless downstream.
pub async fn extract_resume_fields(
    backend: &dyn GenerativeBackend,
    chains: &ModelChains,
    resume_text: &str,
) -> Result<Value, LlmError> {
    let prompt = prompts::extraction_prompt(resume_text);
    let parsed = run_task(
        Stage::Extraction,
        backend,
        chains.chain(ModelTier::Light),
        &prompt,
    )
    .await?;

    if !has_any_key_field(&parsed) {
        warn!("Parsed resume JSON missing all key fields (name, email, skills)");
        return Err(LlmError::IncompleteExtraction);
    }

    Ok(parsed)
}

fn has_any_key_field(parsed: &Value) -> bool {
    let present = |key: &str| match parsed.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    };

    present("name") || present("email") || present("skills")
}

/// Evaluates a resume against a desired role, ATS-style.
///
/// The model reports only the category breakdown; the aggregate `ats_score`
/// is recomputed here as the clamped sum of the ten categories, overwriting
/// anything the model may have claimed. Model arithmetic is not trusted.
pub async fn evaluate_resume(
    backend: &dyn GenerativeBackend,
    chains: &ModelChains,
    resume_text: &str,
    desired_role: &str,
    experience_years: i64,
) -> Result<Value, LlmError> {
    let prompt = prompts::evaluation_prompt(resume_text, desired_role, experience_years);
    let mut parsed = run_task(
        Stage::Evaluation,
        backend,
        chains.chain(ModelTier::Heavy),
        &prompt,
    )
    .await?;

    let score = compute_ats_score(parsed.get("breakdown").unwrap_or(&Value::Null));
    if let Some(object) = parsed.as_object_mut() {
        object.insert("ats_score".to_string(), json!(score));
    }

    Ok(parsed)
}

/// Sums the ten breakdown categories, clamped into `0..=100`. Missing or
/// non-numeric categories count as zero.
pub fn compute_ats_score(breakdown: &Value) -> i64 {
    let sum: f64 = BREAKDOWN_CATEGORIES
        .iter()
        .map(|key| breakdown.get(key).and_then(Value::as_f64).unwrap_or(0.0))
        .sum();

    (sum.round() as i64).clamp(0, MAX_ATS_SCORE)
}

/// Generates the multi-horizon career roadmap.
///
/// Consumes the evaluation task's output and therefore must not be called
/// before a successful evaluation. The repaired plan is returned as-is; it
/// has no numeric fields worth recomputing.
pub async fn generate_roadmap(
    backend: &dyn GenerativeBackend,
    chains: &ModelChains,
    resume_text: &str,
    desired_role: &str,
    evaluation: &Value,
) -> Result<Value, LlmError> {
    let prompt = prompts::roadmap_prompt(resume_text, desired_role, evaluation);
    run_task(
        Stage::Roadmap,
        backend,
        chains.chain(ModelTier::Medium),
        &prompt,
    )
    .await
}
