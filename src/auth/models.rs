//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// JWT claims structure
#[derive(Serialize, Deserialize, Debug)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// User database model
#[derive(FromRow, Serialize, Deserialize, Debug)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub college_name: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub college_name: Option<String>,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}
