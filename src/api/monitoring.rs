//! Terminal health and code generation endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::TerminalType,
        health::{HealthCheckRun, LastCheckResponse, StoreHealthSummary, TerminalHealth},
    },
    AppState,
};

use super::AuthenticatedUser;

#[derive(Serialize, ToSchema)]
pub struct GeneratedCodeResponse {
    pub store_id: i32,
    pub terminal_type: TerminalType,
    pub code: String,
}

/// Health of one terminal
#[utoipa::path(
    get,
    path = "/terminals/{id}/health",
    tag = "monitoring",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Terminal ID")),
    responses(
        (status = 200, description = "Terminal health", body = TerminalHealth),
        (status = 404, description = "Terminal not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_terminal_health(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<TerminalHealth>> {
    state
        .services
        .health
        .get_terminal_health(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::terminal_not_found(id))
}

/// Aggregate health of a store
#[utoipa::path(
    get,
    path = "/stores/{store_id}/health",
    tag = "monitoring",
    security(("bearer_auth" = [])),
    params(("store_id" = i32, Path, description = "Store ID")),
    responses(
        (status = 200, description = "Store health summary", body = StoreHealthSummary),
        (status = 404, description = "Store not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_store_health_summary(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(store_id): Path<i32>,
) -> AppResult<Json<StoreHealthSummary>> {
    let summary = state.services.health.get_store_health_summary(store_id).await?;
    Ok(Json(summary))
}

/// Health of every terminal in a store
#[utoipa::path(
    get,
    path = "/stores/{store_id}/health/terminals",
    tag = "monitoring",
    security(("bearer_auth" = [])),
    params(("store_id" = i32, Path, description = "Store ID")),
    responses(
        (status = 200, description = "Per-terminal health", body = Vec<TerminalHealth>)
    )
)]
pub async fn get_store_terminal_health(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(store_id): Path<i32>,
) -> AppResult<Json<Vec<TerminalHealth>>> {
    let snapshots = state.services.health.get_store_terminal_health(store_id).await?;
    Ok(Json(snapshots))
}

/// Force a health check of a store now
#[utoipa::path(
    post,
    path = "/stores/{store_id}/health/check",
    tag = "monitoring",
    security(("bearer_auth" = [])),
    params(("store_id" = i32, Path, description = "Store ID")),
    responses(
        (status = 200, description = "Health check completed", body = HealthCheckRun)
    )
)]
pub async fn run_health_check(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(store_id): Path<i32>,
) -> AppResult<Json<HealthCheckRun>> {
    claims.require_manage_terminals()?;
    let run = state.services.health.run_health_check_now(store_id).await?;
    Ok(Json(run))
}

/// Time of the most recent health check
#[utoipa::path(
    get,
    path = "/health/last-check",
    tag = "monitoring",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Last health check time", body = LastCheckResponse)
    )
)]
pub async fn get_last_check_time(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> Json<LastCheckResponse> {
    Json(LastCheckResponse {
        last_check_time: state.services.health.get_last_check_time().await,
    })
}

/// Preview the next code for a terminal type
#[utoipa::path(
    get,
    path = "/stores/{store_id}/terminal-codes/{terminal_type}",
    tag = "monitoring",
    security(("bearer_auth" = [])),
    params(
        ("store_id" = i32, Path, description = "Store ID"),
        ("terminal_type" = TerminalType, Path, description = "Terminal type, e.g. kitchen_display")
    ),
    responses(
        (status = 200, description = "Next free code", body = GeneratedCodeResponse),
        (status = 400, description = "Code sequence exhausted", body = crate::error::ErrorResponse),
        (status = 404, description = "Store not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn generate_terminal_code(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((store_id, terminal_type)): Path<(i32, TerminalType)>,
) -> AppResult<Json<GeneratedCodeResponse>> {
    claims.require_manage_terminals()?;
    let code = state
        .services
        .codes
        .generate_terminal_code(store_id, terminal_type)
        .await?;
    Ok(Json(GeneratedCodeResponse {
        store_id,
        terminal_type,
        code,
    }))
}
