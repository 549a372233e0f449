pub mod handlers;
pub mod middleware;
pub mod models;
pub mod service;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use etude_auth::PasswordError;
use etude_db::AuthStore;

pub use service::{AuthService, SecurityConfig};

/// Application state shared across handlers
pub struct AppState {
    pub service: AuthService,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Etude API",
        version = "0.1.0",
        description = "REST API for the Etude practice tracking backend",
        contact(
            name = "Etude Team",
            email = "team@etude.dev"
        )
    ),
    paths(
        handlers::login,
        handlers::refresh_token,
        handlers::register,
        handlers::get_current_user,
        handlers::health_check,
    ),
    components(
        schemas(
            models::AccessTokenForm,
            models::AccessTokenResponse,
            models::RefreshTokenRequest,
            models::RegisterRequest,
            models::UserResponse,
            models::HealthResponse,
            models::ErrorResponse,
        )
    ),
    tags(
        (name = "auth", description = "Authentication endpoints"),
        (name = "users", description = "User endpoints"),
        (name = "system", description = "System health and info endpoints")
    )
)]
struct ApiDoc;

/// API server configuration
///
/// There is no `Default`: the JWT secret inside [`SecurityConfig`] has no
/// safe fallback and must be supplied by the caller.
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Enable CORS (for development)
    pub enable_cors: bool,
    /// Security parameters passed through to the auth service
    pub security: SecurityConfig,
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    /// Create a new API server on top of any [`AuthStore`]
    pub fn new(config: ApiServerConfig, store: Arc<dyn AuthStore>) -> Result<Self, PasswordError> {
        let service = AuthService::new(store, &config.security)?;
        let state = Arc::new(AppState { service });

        Ok(Self { config, state })
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        // Get the OpenAPI spec
        let api_doc = ApiDoc::openapi();

        // Build PUBLIC routes (no authentication required)
        let public_router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/auth/access-token", post(handlers::login))
            .route("/auth/refresh-token", post(handlers::refresh_token))
            .route("/auth/register", post(handlers::register))
            .with_state(self.state.clone());

        // Build PROTECTED routes (require a bearer access token)
        let protected_router = Router::new()
            .route("/users/me", get(handlers::get_current_user))
            .with_state(self.state.clone())
            .layer(axum_middleware::from_fn_with_state(
                self.state.clone(),
                middleware::require_auth,
            ));

        // Merge public and protected routers
        let api_router = public_router.merge(protected_router);

        // SwaggerUi automatically creates a route for /openapi.json
        let router = Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", api_doc))
            .merge(api_router);

        // Configure CORS
        let cors = if self.config.enable_cors {
            use tower_http::cors::AllowOrigin;

            let cors_layer = CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _| {
                    // Allow common development origins
                    let origin_str = origin.to_str().unwrap_or("");
                    origin_str.starts_with("http://localhost:")
                        || origin_str.starts_with("http://127.0.0.1:")
                        || origin_str.starts_with("https://localhost:")
                        || origin_str.starts_with("https://127.0.0.1:")
                }));

            Some(cors_layer)
        } else {
            None
        };

        // Build middleware stack
        let mut router = router.layer(TraceLayer::new_for_http());

        if let Some(cors) = cors {
            router = router.layer(cors);
        }

        router
    }

    /// Start the API server
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let router = self.build_router();

        info!("Starting API server on {}", self.config.bind_addr);
        info!(
            "OpenAPI spec: http://{}/openapi.json",
            self.config.bind_addr
        );
        info!("Swagger UI: http://{}/swagger-ui", self.config.bind_addr);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(listener, router)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() {
        // Ensure OpenAPI spec can be generated without panics
        let _api_doc = ApiDoc::openapi();
    }
}
