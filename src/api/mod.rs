//! API handlers for Tillwatch REST endpoints

pub mod health;
pub mod monitoring;
pub mod openapi;
pub mod terminals;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Service health
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Terminal registry
        .route("/terminals", post(terminals::create_terminal))
        .route("/terminals/register", post(terminals::register_terminal))
        .route("/terminals/:id", get(terminals::get_terminal))
        .route("/terminals/:id/configuration", put(terminals::update_configuration))
        .route(
            "/terminals/:id/machine",
            put(terminals::bind_machine).delete(terminals::unbind_machine),
        )
        .route("/terminals/:id/deactivate", post(terminals::deactivate_terminal))
        .route("/terminals/:id/heartbeat", post(terminals::heartbeat))
        .route("/stores/:store_id/terminals", get(terminals::list_store_terminals))
        // Terminal health
        .route("/terminals/:id/health", get(monitoring::get_terminal_health))
        .route("/stores/:store_id/health", get(monitoring::get_store_health_summary))
        .route("/stores/:store_id/health/terminals", get(monitoring::get_store_terminal_health))
        .route("/stores/:store_id/health/check", post(monitoring::run_health_check))
        .route("/health/last-check", get(monitoring::get_last_check_time))
        // Code generation
        .route(
            "/stores/:store_id/terminal-codes/:terminal_type",
            get(monitoring::generate_terminal_code),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
