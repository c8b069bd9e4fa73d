use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Message the connection service answers a failed credential check with. Any other 401
/// from the connection service means the caller's internal token was refused.
pub const INVALID_CREDENTIALS: &str = "invalid credentials";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

/// Identity the connection service vouches for after checking credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    #[serde(rename = "id_usuario")]
    pub user_id: i64,
    #[serde(rename = "id_persona")]
    pub person_id: i64,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}
