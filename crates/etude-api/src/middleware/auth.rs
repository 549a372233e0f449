//! Bearer Token Authentication Middleware
//!
//! Resolves `Authorization: Bearer <jwt>` to a live user record and makes
//! it available to handlers via Axum's Extension.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use etude_db::entities::user::UserRole;

use crate::models::ErrorResponse;
use crate::service::AuthError;
use crate::AppState;

/// Authenticated user context extracted from the access token
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// User UUID
    pub user_id: Uuid,
    /// User login
    pub login: String,
    /// User role (admin, user)
    pub role: UserRole,
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

/// Authentication middleware for protected endpoints
///
/// # Errors
/// Returns 401 Unauthorized if:
/// - The Authorization header is missing or not a Bearer credential
/// - The token fails signature, issuer or expiry checks
/// - The token is valid but its user no longer exists
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let token = match bearer_token(&request) {
        Some(token) => token,
        None => return Err(AuthError::NotAuthenticated.into()),
    };

    let resolved = state.service.current_user(&token).await?;

    request.extensions_mut().insert(AuthUser {
        user_id: resolved.id,
        login: resolved.login,
        role: resolved.role,
    });

    Ok(next.run(request).await)
}
