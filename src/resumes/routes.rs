// src/resumes/routes.rs

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

pub fn resumes_routes() -> Router {
    Router::new()
        .route(
            "/api/resumes",
            post(handlers::upload_resume).get(handlers::get_user_resumes),
        )
        .route(
            "/api/resumes/:id",
            get(handlers::get_resume).delete(handlers::delete_resume),
        )
        .route(
            "/api/resumes/:id/analytics",
            get(handlers::get_resume_analytics),
        )
}
