// src/resumes/handlers.rs

use axum::{
    extract::{Extension, Multipart, Path},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::analytics::{spawn_analytics_sequence, AnalyticsStatus};
use super::models::{ExtractedFields, Resume, ResumeListItem};
use crate::auth::AuthedUser;
use crate::common::{generate_resume_id, ApiError, AppState};
use crate::llm::tasks::extract_resume_fields;
use crate::llm::{GenerativeBackend, LlmError, ProviderError};

/// POST /api/resumes - Upload a resume PDF
///
/// Synchronous path: validate the PDF, store the file, extract text, run the
/// extraction task, persist the row with a pending analytics envelope. The
/// evaluation/roadmap stages run in a detached background task after the
/// response; their only visible signal is the analytics status.
pub async fn upload_resume(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    info!(user_id = %authed.id, "User uploading resume");

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart payload".to_string()))?
    {
        if field.name() != Some("resume") {
            continue;
        }

        let filename = field.file_name().unwrap_or("resume.pdf").to_string();

        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::BadRequest("Invalid file".to_string()))?;

        if !filename.to_lowercase().ends_with(".pdf") {
            return Err(ApiError::BadRequest(
                "Only PDF files are allowed".to_string(),
            ));
        }

        let is_pdf = infer::get(&data)
            .map(|kind| kind.mime_type() == "application/pdf")
            .unwrap_or(false);
        if !is_pdf {
            return Err(ApiError::BadRequest(
                "File content is not a valid PDF".to_string(),
            ));
        }

        let resume_id = generate_resume_id();
        let safe_filename = format!("{}.pdf", resume_id);

        let stored = state
            .storage_service
            .store_resume(&data, &safe_filename)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %authed.id, "Failed to store resume file");
                ApiError::InternalServer("Failed to save resume".to_string())
            })?;

        let resume_text = match extract_text_from_pdf(&data) {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => {
                cleanup_stored_file(&state, &stored.location()).await;
                return Err(ApiError::BadRequest(
                    "No text could be extracted from the PDF".to_string(),
                ));
            }
            Err(e) => {
                warn!(error = %e, user_id = %authed.id, "Failed to extract text from PDF");
                cleanup_stored_file(&state, &stored.location()).await;
                return Err(ApiError::BadRequest(
                    "Could not read the PDF file".to_string(),
                ));
            }
        };

        // Extraction blocks the response: a resume without structured fields
        // is not worth saving.
        let parsed = match extract_resume_fields(
            state.gemini_service.as_ref(),
            &state.model_chains,
            &resume_text,
        )
        .await
        {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(error = %e, user_id = %authed.id, "Resume extraction failed");
                cleanup_stored_file(&state, &stored.location()).await;
                return Err(extraction_error_to_api(e));
            }
        };

        let fields = ExtractedFields::from_value(&parsed);
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO resumes (
                id, user_id, filename, file_location,
                name, email, phone, linkedin, github,
                cgpa, twelfth_percent, tenth_percent, backlogs,
                experience_years, desired_role, communication_rating,
                skills, projects, certifications, hackathon, internships,
                extracted_text, analytics_status, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&resume_id)
        .bind(&authed.id)
        .bind(&filename)
        .bind(stored.location())
        .bind(&fields.name)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(&fields.linkedin)
        .bind(&fields.github)
        .bind(fields.cgpa)
        .bind(fields.twelfth_percent)
        .bind(fields.tenth_percent)
        .bind(fields.backlogs)
        .bind(fields.experience_years)
        .bind(&fields.desired_role)
        .bind(fields.communication_rating)
        .bind(&fields.skills)
        .bind(&fields.projects)
        .bind(&fields.certifications)
        .bind(&fields.hackathon)
        .bind(&fields.internships)
        .bind(&resume_text)
        .bind(AnalyticsStatus::Pending.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        info!(
            user_id = %authed.id,
            resume_id = %resume_id,
            "Resume saved, dispatching analytics sequence"
        );

        let backend: Arc<dyn GenerativeBackend> = state.gemini_service.clone();
        spawn_analytics_sequence(
            state.db.clone(),
            backend,
            state.model_chains.clone(),
            resume_id.clone(),
            Some(resume_text),
            fields.desired_role.clone(),
            fields.experience_years.unwrap_or(0),
        );

        return Ok((
            StatusCode::CREATED,
            Json(json!({
                "id": resume_id,
                "filename": filename,
                "analytics_status": AnalyticsStatus::Pending.as_str(),
                "extracted": parsed,
                "message": "Resume saved successfully"
            })),
        ));
    }

    Err(ApiError::BadRequest("No resume file provided".to_string()))
}

/// GET /api/resumes - List the caller's resumes
pub async fn get_user_resumes(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<Vec<ResumeListItem>>, ApiError> {
    let state = state_lock.read().await.clone();

    let resumes = sqlx::query_as::<_, ResumeListItem>(
        r#"
        SELECT id, filename, name, desired_role, analytics_status, created_at
        FROM resumes WHERE user_id = ? ORDER BY created_at DESC
        "#,
    )
    .bind(&authed.id)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    Ok(Json(resumes))
}

/// GET /api/resumes/:id - Full resume aggregate including the envelope
pub async fn get_resume(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(resume_id): Path<String>,
) -> Result<Json<Resume>, ApiError> {
    let state = state_lock.read().await.clone();

    let resume = fetch_owned_resume(&state, &resume_id, &authed.id).await?;
    Ok(Json(resume))
}

/// GET /api/resumes/:id/analytics - The analytics envelope only
pub async fn get_resume_analytics(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(resume_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let resume = fetch_owned_resume(&state, &resume_id, &authed.id).await?;

    let status = AnalyticsStatus::parse(&resume.analytics_status);
    let evaluation = resume
        .ats_evaluation
        .as_deref()
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
        .unwrap_or(serde_json::Value::Null);
    let roadmap = resume
        .career_roadmap
        .as_deref()
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
        .unwrap_or(serde_json::Value::Null);

    Ok(Json(json!({
        "resume_id": resume.id,
        "status": status.as_str(),
        "ats_evaluation": evaluation,
        "career_roadmap": roadmap,
    })))
}

/// DELETE /api/resumes/:id - Delete a resume and its stored file
///
/// A still-running analytics task for this resume is not cancelled; its
/// final persistence write will match zero rows and silently no-op.
pub async fn delete_resume(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(resume_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let resume = fetch_owned_resume(&state, &resume_id, &authed.id).await?;

    if let Err(e) = state.storage_service.delete_resume(&resume.file_location).await {
        warn!(error = %e, resume_id = %resume_id, "Failed to delete stored resume file");
    }

    sqlx::query("DELETE FROM resumes WHERE id = ? AND user_id = ?")
        .bind(&resume_id)
        .bind(&authed.id)
        .execute(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    info!(user_id = %authed.id, resume_id = %resume_id, "Resume deleted");

    Ok(Json(json!({ "message": "Resume deleted successfully" })))
}

async fn fetch_owned_resume(
    state: &AppState,
    resume_id: &str,
    user_id: &str,
) -> Result<Resume, ApiError> {
    sqlx::query_as::<_, Resume>("SELECT * FROM resumes WHERE id = ? AND user_id = ?")
        .bind(resume_id)
        .bind(user_id)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound("Resume not found".to_string()))
}

/// Extract text from PDF bytes, collapsing runs of whitespace.
fn extract_text_from_pdf(pdf_bytes: &[u8]) -> Result<String, String> {
    let raw = pdf_extract::extract_text_from_mem(pdf_bytes)
        .map_err(|e| format!("PDF extraction error: {}", e))?;
    Ok(raw.split_whitespace().collect::<Vec<_>>().join(" "))
}

async fn cleanup_stored_file(state: &AppState, location: &str) {
    if let Err(e) = state.storage_service.delete_resume(location).await {
        warn!(error = %e, location = %location, "Failed to clean up stored file");
    }
}

fn extraction_error_to_api(e: LlmError) -> ApiError {
    match e {
        LlmError::Provider(ProviderError::NotConfigured) => {
            ApiError::ServiceUnavailable("AI service not configured".to_string())
        }
        LlmError::GenerationFailed { .. } | LlmError::AllModelsExhausted { .. } => {
            ApiError::ServiceUnavailable(format!("AI service error: {}", e))
        }
        other => ApiError::ProcessingError(format!("Failed to extract resume info: {}", other)),
    }
}
