//! # Auth Module
//!
//! Password registration and login, JWT token issuance and validation, and
//! the AuthedUser extractor for protected routes.

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;


pub use extractors::AuthedUser;
pub use models::User;
pub use routes::auth_routes;
