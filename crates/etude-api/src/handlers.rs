use axum::{extract::State, http::StatusCode, Extension, Form, Json};
use std::sync::Arc;
use tracing::{debug, info};

use crate::middleware::AuthUser;
use crate::models::*;
use crate::AppState;

/// Exchange login credentials for an access + refresh token pair
#[utoipa::path(
    post,
    path = "/auth/access-token",
    request_body(content = AccessTokenForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token pair issued", body = AccessTokenResponse),
        (status = 400, description = "Incorrect credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AccessTokenForm>,
) -> Result<Json<AccessTokenResponse>, (StatusCode, Json<ErrorResponse>)> {
    debug!("Login attempt for {}", form.username);

    let tokens = state.service.login(&form.username, &form.password).await?;

    Ok(Json(tokens.into()))
}

/// Redeem a refresh token for a new token pair
///
/// The presented token is spent by this call; a replacement comes back in
/// the response. Concurrent redemptions of the same token lose with 409
/// and may retry.
#[utoipa::path(
    post,
    path = "/auth/refresh-token",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Token pair issued", body = AccessTokenResponse),
        (status = 400, description = "Refresh token expired or already used", body = ErrorResponse),
        (status = 404, description = "Refresh token not found", body = ErrorResponse),
        (status = 409, description = "Refresh token is being redeemed by another request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<AccessTokenResponse>, (StatusCode, Json<ErrorResponse>)> {
    debug!("Redeeming refresh token");

    let tokens = state.service.refresh(&request.refresh_token).await?;

    Ok(Json(tokens.into()))
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Login already taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), (StatusCode, Json<ErrorResponse>)> {
    info!("Registering user {}", request.login);

    let created = state
        .service
        .register(&request.login, &request.password)
        .await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Get the authenticated user
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing, invalid or orphaned credentials", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_current_user(Extension(current): Extension<AuthUser>) -> Json<UserResponse> {
    Json(UserResponse {
        user_id: current.user_id,
        login: current.login,
    })
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
