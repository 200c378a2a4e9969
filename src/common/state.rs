// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::llm::ModelChains;
use crate::services::{GeminiService, StorageService};

/// Application state containing database pool, services, and configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub jwt_secret: String,
    pub gemini_service: Arc<GeminiService>,
    pub storage_service: Arc<StorageService>,
    pub model_chains: ModelChains,
}
