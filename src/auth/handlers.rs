//! Authentication handlers

use axum::extract::{Extension, Json};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::extractors::AuthedUser;
use super::models::{Claims, LoginRequest, RegisterRequest, User};
use crate::common::{generate_user_id, safe_email_log, ApiError, AppState};

const BCRYPT_COST: u32 = 10;
const TOKEN_LIFETIME_DAYS: i64 = 7;

/// POST /api/auth/register
/// Creates a user account and issues a JWT
///
/// # Request Body
/// ```json
/// {
///   "name": "Jane",
///   "college_name": "Example Institute",
///   "email": "jane@example.com",
///   "password": "secret"
/// }
/// ```
pub async fn register(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("valid email is required".to_string()));
    }
    if payload.password.len() < 6 {
        return Err(ApiError::BadRequest(
            "password must be at least 6 characters".to_string(),
        ));
    }

    let existing: Option<User> = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    if existing.is_some() {
        warn!(email = %safe_email_log(&email), "Registration rejected, user already exists");
        return Err(ApiError::BadRequest("User already exists".to_string()));
    }

    let password_hash = bcrypt::hash(&payload.password, BCRYPT_COST).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        ApiError::InternalServer("registration failed".to_string())
    })?;

    let id = generate_user_id();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO users (id, name, college_name, email, password_hash, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(payload.name.as_deref())
    .bind(payload.college_name.as_deref())
    .bind(&email)
    .bind(&password_hash)
    .bind(&now)
    .execute(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    let token = issue_token(&id, &state.jwt_secret)?;

    info!(
        user_id = %id,
        email = %safe_email_log(&email),
        "User registered successfully"
    );

    Ok(Json(serde_json::json!({
        "message": "User registered successfully",
        "token": token,
        "user": {
            "id": id,
            "name": payload.name,
            "college_name": payload.college_name,
            "email": email,
        },
    })))
}

/// POST /api/auth/login
/// Verifies credentials and issues a JWT
pub async fn login(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let email = payload.email.trim().to_lowercase();

    let user: Option<User> = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    let user = match user {
        Some(u) => u,
        None => {
            warn!(email = %safe_email_log(&email), "Login failed: unknown email");
            return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
        }
    };

    let matches = bcrypt::verify(&payload.password, &user.password_hash).map_err(|e| {
        error!(error = %e, user_id = %user.id, "Password verification failed");
        ApiError::InternalServer("login failed".to_string())
    })?;

    if !matches {
        warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = issue_token(&user.id, &state.jwt_secret)?;

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        "Login successful"
    );

    Ok(Json(serde_json::json!({
        "message": "Login successful",
        "token": token,
        "user": user,
    })))
}

/// POST /api/auth/logout
/// Logout is handled client-side with JWT tokens; this endpoint just
/// acknowledges the request
pub async fn logout_handler(_authed: AuthedUser) -> Result<Json<serde_json::Value>, ApiError> {
    info!("User logout successful");
    Ok(Json(serde_json::json!({
        "message": "Logout successful"
    })))
}

/// GET /api/me
/// Returns the current authenticated user's information
pub async fn me_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&authed.id)
        .fetch_one(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    Ok(Json(serde_json::json!({ "user": user })))
}

fn issue_token(user_id: &str, jwt_secret: &str) -> Result<String, ApiError> {
    let exp = (Utc::now() + Duration::days(TOKEN_LIFETIME_DAYS)).timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        exp,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        error!(error = %e, user_id = %user_id, "JWT encoding error");
        ApiError::InternalServer("jwt error".to_string())
    })
}
