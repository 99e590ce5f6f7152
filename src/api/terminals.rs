//! Terminal registry and heartbeat endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::terminal::{
        BindMachine, CreateTerminal, Heartbeat, Terminal, TerminalEntry, UpdateConfiguration,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Register a terminal performing its first handshake
#[utoipa::path(
    post,
    path = "/terminals/register",
    tag = "terminals",
    security(("bearer_auth" = [])),
    request_body = CreateTerminal,
    responses(
        (status = 201, description = "Terminal registered (online)", body = Terminal),
        (status = 400, description = "Invalid input or duplicate code", body = crate::error::ErrorResponse),
        (status = 404, description = "Store not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Code taken concurrently", body = crate::error::ErrorResponse)
    )
)]
pub async fn register_terminal(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateTerminal>,
) -> AppResult<(StatusCode, Json<Terminal>)> {
    claims.require_manage_terminals()?;
    let terminal = state.services.terminals.register_terminal(data, claims.user_id).await?;
    Ok((StatusCode::CREATED, Json(terminal)))
}

/// Create a terminal that has not connected yet
#[utoipa::path(
    post,
    path = "/terminals",
    tag = "terminals",
    security(("bearer_auth" = [])),
    request_body = CreateTerminal,
    responses(
        (status = 201, description = "Terminal created (offline until first heartbeat)", body = Terminal),
        (status = 400, description = "Invalid input or duplicate code", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_terminal(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateTerminal>,
) -> AppResult<(StatusCode, Json<Terminal>)> {
    claims.require_manage_terminals()?;
    let terminal = state.services.terminals.create_terminal(data, claims.user_id).await?;
    Ok((StatusCode::CREATED, Json(terminal)))
}

/// Get terminal by ID
#[utoipa::path(
    get,
    path = "/terminals/{id}",
    tag = "terminals",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Terminal ID")),
    responses(
        (status = 200, description = "Terminal details", body = Terminal),
        (status = 404, description = "Terminal not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_terminal(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Terminal>> {
    state
        .services
        .terminals
        .get_terminal_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::terminal_not_found(id))
}

/// List the terminals of a store
#[utoipa::path(
    get,
    path = "/stores/{store_id}/terminals",
    tag = "terminals",
    security(("bearer_auth" = [])),
    params(("store_id" = i32, Path, description = "Store ID")),
    responses(
        (status = 200, description = "Terminals of the store", body = Vec<Terminal>),
        (status = 404, description = "Store not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_store_terminals(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(store_id): Path<i32>,
) -> AppResult<Json<Vec<Terminal>>> {
    let entries = state.services.terminals.list_store_terminals(store_id).await?;
    Ok(Json(decoded_terminals(store_id, entries)))
}

/// Keep the terminals that decoded. Broken records are logged here and
/// reported as `unknown` by the store health endpoints.
fn decoded_terminals(store_id: i32, entries: Vec<TerminalEntry>) -> Vec<Terminal> {
    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(terminal) => Some(terminal),
            Err(record) => {
                tracing::warn!(
                    "Terminal {} ({}) in store {} left out of the listing: {}",
                    record.code,
                    record.id,
                    store_id,
                    record.reason
                );
                None
            }
        })
        .collect()
}

/// Replace the printer and hardware configuration
#[utoipa::path(
    put,
    path = "/terminals/{id}/configuration",
    tag = "terminals",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Terminal ID")),
    request_body = UpdateConfiguration,
    responses(
        (status = 200, description = "Configuration updated", body = Terminal)
    )
)]
pub async fn update_configuration(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateConfiguration>,
) -> AppResult<Json<Terminal>> {
    claims.require_manage_terminals()?;
    let terminal = state
        .services
        .terminals
        .update_configuration(
            id,
            data.printer_configuration,
            data.hardware_configuration,
            claims.user_id,
        )
        .await?;
    Ok(Json(terminal))
}

/// Bind the terminal to a machine
#[utoipa::path(
    put,
    path = "/terminals/{id}/machine",
    tag = "terminals",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Terminal ID")),
    request_body = BindMachine,
    responses(
        (status = 200, description = "Machine bound", body = Terminal)
    )
)]
pub async fn bind_machine(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<BindMachine>,
) -> AppResult<Json<Terminal>> {
    claims.require_manage_terminals()?;
    let terminal = state.services.terminals.bind_machine(id, data, claims.user_id).await?;
    Ok(Json(terminal))
}

/// Clear the machine binding
#[utoipa::path(
    delete,
    path = "/terminals/{id}/machine",
    tag = "terminals",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Terminal ID")),
    responses(
        (status = 200, description = "Machine unbound", body = Terminal)
    )
)]
pub async fn unbind_machine(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Terminal>> {
    claims.require_manage_terminals()?;
    let terminal = state.services.terminals.unbind_machine(id, claims.user_id).await?;
    Ok(Json(terminal))
}

/// Deactivate (retire) a terminal
#[utoipa::path(
    post,
    path = "/terminals/{id}/deactivate",
    tag = "terminals",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Terminal ID")),
    responses(
        (status = 200, description = "Terminal deactivated", body = Terminal)
    )
)]
pub async fn deactivate_terminal(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Terminal>> {
    claims.require_manage_terminals()?;
    let terminal = state.services.terminals.deactivate_terminal(id, claims.user_id).await?;
    Ok(Json(terminal))
}

/// Heartbeat sent by a terminal
#[utoipa::path(
    post,
    path = "/terminals/{id}/heartbeat",
    tag = "terminals",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Terminal ID")),
    request_body = Heartbeat,
    responses(
        (status = 204, description = "Heartbeat recorded"),
        (status = 404, description = "Terminal not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn heartbeat(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<Heartbeat>,
) -> AppResult<StatusCode> {
    state.services.terminals.update_heartbeat(id, data).await?;
    Ok(StatusCode::NO_CONTENT)
}
