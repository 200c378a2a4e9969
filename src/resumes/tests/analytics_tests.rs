// src/resumes/tests/analytics_tests.rs

#[cfg(test)]
mod tests {
    use crate::common::migrations::run_migrations;
    use crate::llm::error::ProviderError;
    use crate::llm::{GenerativeBackend, ModelChains};
    use crate::resumes::analytics::{run_analytics_sequence, AnalyticsStatus};
    use async_trait::async_trait;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;
    use std::sync::Mutex;

    const EVALUATION_RESPONSE: &str = r#"{
        "breakdown": {
            "section_completeness": 8,
            "contact_score": 4,
            "chronology_score": 7,
            "experience_quality": 12,
            "quantification_score": 6,
            "action_verbs_score": 7,
            "skills_score": 8,
            "readability_score": 8,
            "education_score": 4,
            "role_alignment_score": 11
        },
        "strengths": ["clear structure"],
        "weaknesses": ["few metrics"]
    }"#;

    const ROADMAP_RESPONSE: &str = r#"{
        "priority_actions_ranked": ["quantify achievements"],
        "impact_projection": {"resume_strength_improvement": "moderate"}
    }"#;

    /// Fake backend: pops one scripted response per call and records the
    /// persisted analytics status at the moment of each call.
    struct FakeBackend {
        pool: SqlitePool,
        resume_id: String,
        responses: Mutex<Vec<Result<String, ProviderError>>>,
        statuses_seen: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn new(
            pool: SqlitePool,
            resume_id: &str,
            responses: Vec<Result<String, ProviderError>>,
        ) -> Self {
            Self {
                pool,
                resume_id: resume_id.to_string(),
                responses: Mutex::new(responses),
                statuses_seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.statuses_seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GenerativeBackend for FakeBackend {
        async fn generate(&self, _model: &str, _prompt: &str) -> Result<String, ProviderError> {
            let status: String =
                sqlx::query_scalar("SELECT analytics_status FROM resumes WHERE id = ?")
                    .bind(&self.resume_id)
                    .fetch_one(&self.pool)
                    .await
                    .expect("resume row");
            self.statuses_seen.lock().unwrap().push(status);

            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                panic!("backend called more times than scripted");
            }
            responses.remove(0)
        }
    }

    fn chains() -> ModelChains {
        ModelChains::new(
            vec!["light".to_string()],
            vec!["medium".to_string()],
            vec!["heavy".to_string()],
        )
    }

    async fn setup_resume(desired_role: Option<&str>) -> (SqlitePool, String) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("pool");
        run_migrations(&pool).await.expect("migrations");

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind("U_TEST01")
        .bind("jane@example.com")
        .bind("hash")
        .bind("2026-01-01T00:00:00Z")
        .execute(&pool)
        .await
        .expect("user insert");

        sqlx::query(
            r#"
            INSERT INTO resumes (
                id, user_id, filename, file_location, desired_role,
                extracted_text, analytics_status, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?)
            "#,
        )
        .bind("R_TEST01")
        .bind("U_TEST01")
        .bind("resume.pdf")
        .bind("local:/tmp/resume.pdf")
        .bind(desired_role)
        .bind("Jane Doe jane@example.com Rust SQL")
        .bind("2026-01-01T00:00:00Z")
        .bind("2026-01-01T00:00:00Z")
        .execute(&pool)
        .await
        .expect("resume insert");

        (pool, "R_TEST01".to_string())
    }

    async fn envelope(pool: &SqlitePool, id: &str) -> (String, Option<String>, Option<String>) {
        sqlx::query_as(
            "SELECT analytics_status, ats_evaluation, career_roadmap FROM resumes WHERE id = ?",
        )
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("envelope row")
    }

    #[tokio::test]
    async fn full_sequence_persists_both_results() {
        let (pool, id) = setup_resume(Some("Backend Engineer")).await;
        let backend = FakeBackend::new(
            pool.clone(),
            &id,
            vec![
                Ok(EVALUATION_RESPONSE.to_string()),
                Ok(ROADMAP_RESPONSE.to_string()),
            ],
        );

        run_analytics_sequence(&pool, &backend, &chains(), &id, Some("resume text"), Some("Backend Engineer"), 2).await;

        let (status, evaluation, roadmap) = envelope(&pool, &id).await;
        assert_eq!(status, "completed");

        let evaluation: serde_json::Value =
            serde_json::from_str(&evaluation.expect("evaluation set")).unwrap();
        // Recomputed deterministically from the breakdown.
        assert_eq!(evaluation["ats_score"], 75);

        let roadmap: serde_json::Value =
            serde_json::from_str(&roadmap.expect("roadmap set")).unwrap();
        assert_eq!(roadmap["priority_actions_ranked"][0], "quantify achievements");

        // The backend observed the row in `processing` during both stages.
        assert_eq!(
            backend.statuses_seen.lock().unwrap().as_slice(),
            ["processing", "processing"]
        );
    }

    #[tokio::test]
    async fn roadmap_failure_keeps_evaluation() {
        let (pool, id) = setup_resume(Some("Backend Engineer")).await;
        // Roadmap response carries no JSON object: the stage fails after a
        // successful model call, without triggering retries.
        let backend = FakeBackend::new(
            pool.clone(),
            &id,
            vec![
                Ok(EVALUATION_RESPONSE.to_string()),
                Ok("cannot generate a roadmap right now".to_string()),
            ],
        );

        run_analytics_sequence(&pool, &backend, &chains(), &id, Some("resume text"), Some("Backend Engineer"), 2).await;

        let (status, evaluation, roadmap) = envelope(&pool, &id).await;
        assert_eq!(status, "completed");
        assert!(evaluation.is_some());
        assert!(roadmap.is_none());
    }

    #[tokio::test]
    async fn evaluation_failure_skips_roadmap() {
        let (pool, id) = setup_resume(Some("Backend Engineer")).await;
        let backend = FakeBackend::new(
            pool.clone(),
            &id,
            vec![Ok("no structured output today".to_string())],
        );

        run_analytics_sequence(&pool, &backend, &chains(), &id, Some("resume text"), Some("Backend Engineer"), 2).await;

        let (status, evaluation, roadmap) = envelope(&pool, &id).await;
        assert_eq!(status, "completed");
        assert!(evaluation.is_none());
        assert!(roadmap.is_none());
        // The roadmap stage never ran.
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn missing_desired_role_completes_with_empty_envelope() {
        let (pool, id) = setup_resume(None).await;
        let backend = FakeBackend::new(pool.clone(), &id, vec![]);

        run_analytics_sequence(&pool, &backend, &chains(), &id, Some("resume text"), None, 0).await;

        let (status, evaluation, roadmap) = envelope(&pool, &id).await;
        assert_eq!(status, "completed");
        assert!(evaluation.is_none());
        assert!(roadmap.is_none());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn deleted_resume_is_a_silent_no_op() {
        let (pool, id) = setup_resume(Some("Backend Engineer")).await;
        sqlx::query("DELETE FROM resumes WHERE id = ?")
            .bind(&id)
            .execute(&pool)
            .await
            .unwrap();

        struct NoRowBackend;

        #[async_trait]
        impl GenerativeBackend for NoRowBackend {
            async fn generate(&self, _: &str, _: &str) -> Result<String, ProviderError> {
                Ok(EVALUATION_RESPONSE.to_string())
            }
        }

        // Must not panic; the final write matches zero rows.
        run_analytics_sequence(&pool, &NoRowBackend, &chains(), &id, Some("text"), Some("role"), 0).await;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resumes")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn unknown_status_strings_read_as_pending() {
        assert_eq!(AnalyticsStatus::parse("pending"), AnalyticsStatus::Pending);
        assert_eq!(
            AnalyticsStatus::parse("processing"),
            AnalyticsStatus::Processing
        );
        assert_eq!(
            AnalyticsStatus::parse("completed"),
            AnalyticsStatus::Completed
        );
        assert_eq!(AnalyticsStatus::parse("failed"), AnalyticsStatus::Failed);
        assert_eq!(
            AnalyticsStatus::parse("half-finished"),
            AnalyticsStatus::Pending
        );
        assert_eq!(AnalyticsStatus::parse(""), AnalyticsStatus::Pending);
    }
}
