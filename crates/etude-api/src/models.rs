use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::service::SessionTokens;
use etude_db::entities::user;

/// Form body for the password login flow (OAuth2 password grant field names)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessTokenForm {
    /// Login of the account
    pub username: String,
    /// Plaintext password
    pub password: String,
}

/// Bearer token pair returned by login and refresh
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessTokenResponse {
    /// Always "Bearer"
    pub token_type: String,
    /// Signed JWT for the Authorization header
    pub access_token: String,
    /// Unix timestamp (seconds) when the access token expires
    pub expires_at: i64,
    /// Single-use opaque token for obtaining the next pair
    pub refresh_token: String,
    /// Unix timestamp (seconds) when the refresh token expires
    pub refresh_token_expires_at: i64,
}

/// Request body for refresh token rotation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    /// The refresh token issued by a previous login or refresh
    pub refresh_token: String,
}

/// Request body for user registration
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Desired login (must be unique)
    pub login: String,
    /// Plaintext password
    pub password: String,
}

/// Public view of a user account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    /// User UUID
    pub user_id: Uuid,
    /// User login
    pub login: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error description
    pub detail: String,
}

impl From<SessionTokens> for AccessTokenResponse {
    fn from(tokens: SessionTokens) -> Self {
        Self {
            token_type: "Bearer".to_string(),
            access_token: tokens.access.token,
            expires_at: tokens.access.claims.exp,
            refresh_token: tokens.refresh.token,
            refresh_token_expires_at: tokens.refresh.expires_at,
        }
    }
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            user_id: model.id,
            login: model.login,
        }
    }
}
