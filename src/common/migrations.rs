// src/common/migrations.rs
//! Database schema management

use sqlx::SqlitePool;
use tracing::info;

/// Create the schema if it does not exist yet.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    create_user_table(pool).await?;
    create_resume_table(pool).await?;
    create_indexes(pool).await?;

    info!("Database migration completed");
    Ok(())
}

async fn create_user_table(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT,
            college_name TEXT,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_resume_table(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // One row per uploaded resume: file location, the structured fields the
    // extraction task produced, and the analytics envelope mutated by the
    // background sequence.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS resumes (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            filename TEXT NOT NULL,
            file_location TEXT NOT NULL,
            name TEXT,
            email TEXT,
            phone TEXT,
            linkedin TEXT,
            github TEXT,
            cgpa REAL,
            twelfth_percent REAL,
            tenth_percent REAL,
            backlogs INTEGER,
            experience_years INTEGER,
            desired_role TEXT,
            communication_rating INTEGER,
            skills TEXT,
            projects TEXT,
            certifications TEXT,
            hackathon TEXT,
            internships TEXT,
            extracted_text TEXT,
            analytics_status TEXT NOT NULL DEFAULT 'pending',
            ats_evaluation TEXT,
            career_roadmap TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_resumes_user_id ON resumes(user_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_resumes_analytics_status ON resumes(analytics_status)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)")
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn migrations_are_idempotent() {
        // A single connection keeps every query on the same in-memory
        // database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resumes")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
