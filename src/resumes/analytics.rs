// src/resumes/analytics.rs
//! Background analytics orchestration for a single resume.
//!
//! After the synchronous upload response is sent, a detached task drives the
//! dependent generation stages (ATS evaluation, then career roadmap) and
//! persists incremental progress into the resume row's analytics envelope.
//! Stage failures are contained: a dead roadmap never erases a live
//! evaluation, and the only externally visible signal is the persisted
//! status column.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};

use crate::llm::tasks::{evaluate_resume, generate_roadmap};
use crate::llm::{GenerativeBackend, ModelChains};

/// Lifecycle of one resume's analytics envelope. Advances monotonically
/// `Pending -> Processing -> (Completed | Failed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AnalyticsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticsStatus::Pending => "pending",
            AnalyticsStatus::Processing => "processing",
            AnalyticsStatus::Completed => "completed",
            AnalyticsStatus::Failed => "failed",
        }
    }

    /// Unrecognized strings read as `Pending` so a consumer polling an
    /// envelope written by a newer or older build degrades safely.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "processing" => AnalyticsStatus::Processing,
            "completed" => AnalyticsStatus::Completed,
            "failed" => AnalyticsStatus::Failed,
            _ => AnalyticsStatus::Pending,
        }
    }
}

impl std::fmt::Display for AnalyticsStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fire-and-forget entry point: submits the sequence to the runtime with its
/// own error boundary. Completion or failure is observable only through the
/// persisted status column.
pub fn spawn_analytics_sequence(
    pool: SqlitePool,
    backend: Arc<dyn GenerativeBackend>,
    chains: ModelChains,
    resume_id: String,
    extracted_text: Option<String>,
    desired_role: Option<String>,
    experience_years: i64,
) {
    tokio::spawn(async move {
        run_analytics_sequence(
            &pool,
            backend.as_ref(),
            &chains,
            &resume_id,
            extracted_text.as_deref(),
            desired_role.as_deref(),
            experience_years,
        )
        .await;
    });
}

/// Drives the full stage sequence for one resume. Never returns an error:
/// every failure path ends in a persisted status.
pub async fn run_analytics_sequence(
    pool: &SqlitePool,
    backend: &dyn GenerativeBackend,
    chains: &ModelChains,
    resume_id: &str,
    extracted_text: Option<&str>,
    desired_role: Option<&str>,
    experience_years: i64,
) {
    info!(resume_id = %resume_id, "Starting analytics sequence");

    if let Err(e) = set_status(pool, resume_id, AnalyticsStatus::Processing).await {
        warn!(error = %e, resume_id = %resume_id, "Failed to mark resume as processing");
    }

    let mut evaluation = None;
    let mut roadmap = None;

    match (extracted_text, desired_role) {
        (Some(text), Some(role)) if !text.trim().is_empty() && !role.trim().is_empty() => {
            match evaluate_resume(backend, chains, text, role, experience_years).await {
                Ok(result) => {
                    info!(resume_id = %resume_id, "ATS evaluation completed");
                    evaluation = Some(result);
                }
                Err(e) => {
                    warn!(error = %e, resume_id = %resume_id, "ATS evaluation produced no result");
                }
            }

            // The roadmap consumes the evaluation and is skipped without one.
            if let Some(eval) = &evaluation {
                match generate_roadmap(backend, chains, text, role, eval).await {
                    Ok(result) => {
                        info!(resume_id = %resume_id, "Career roadmap completed");
                        roadmap = Some(result);
                    }
                    Err(e) => {
                        warn!(error = %e, resume_id = %resume_id, "Career roadmap produced no result");
                    }
                }
            }
        }
        _ => {
            debug!(
                resume_id = %resume_id,
                "No extracted text or desired role, skipping analytics stages"
            );
        }
    }

    if let Err(e) = persist_results(pool, resume_id, evaluation.as_ref(), roadmap.as_ref()).await {
        error!(error = %e, resume_id = %resume_id, "Failed to persist analytics results");
        // Best effort: record the failure; if even this write dies the row
        // stays at a stale `processing`, surfaced only by external staleness
        // monitoring.
        if let Err(e) = set_status(pool, resume_id, AnalyticsStatus::Failed).await {
            error!(error = %e, resume_id = %resume_id, "Failed to mark resume as failed");
        }
        return;
    }

    info!(
        resume_id = %resume_id,
        has_evaluation = evaluation.is_some(),
        has_roadmap = roadmap.is_some(),
        "Analytics sequence completed"
    );
}

async fn set_status(
    pool: &SqlitePool,
    resume_id: &str,
    status: AnalyticsStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE resumes SET analytics_status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(resume_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Merges whichever stage outputs exist into the envelope and marks the row
/// completed. `COALESCE` keeps any column not recomputed this run; a resume
/// deleted mid-sequence matches zero rows and the write is a silent no-op.
async fn persist_results(
    pool: &SqlitePool,
    resume_id: &str,
    evaluation: Option<&serde_json::Value>,
    roadmap: Option<&serde_json::Value>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE resumes
        SET analytics_status = ?,
            ats_evaluation = COALESCE(?, ats_evaluation),
            career_roadmap = COALESCE(?, career_roadmap),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(AnalyticsStatus::Completed.as_str())
    .bind(evaluation.map(|v| v.to_string()))
    .bind(roadmap.map(|v| v.to_string()))
    .bind(Utc::now().to_rfc3339())
    .bind(resume_id)
    .execute(pool)
    .await?;
    Ok(())
}
