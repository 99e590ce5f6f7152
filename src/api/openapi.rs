//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, monitoring, terminals};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tillwatch API",
        version = "1.0.0",
        description = "POS terminal registry and health monitoring REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Terminals
        terminals::register_terminal,
        terminals::create_terminal,
        terminals::get_terminal,
        terminals::list_store_terminals,
        terminals::update_configuration,
        terminals::bind_machine,
        terminals::unbind_machine,
        terminals::deactivate_terminal,
        terminals::heartbeat,
        // Monitoring
        monitoring::get_terminal_health,
        monitoring::get_store_health_summary,
        monitoring::get_store_terminal_health,
        monitoring::run_health_check,
        monitoring::get_last_check_time,
        monitoring::generate_terminal_code,
    ),
    components(
        schemas(
            // Terminals
            crate::models::terminal::Terminal,
            crate::models::terminal::CreateTerminal,
            crate::models::terminal::UpdateConfiguration,
            crate::models::terminal::BindMachine,
            crate::models::terminal::Heartbeat,
            crate::models::enums::TerminalType,
            crate::models::enums::BusinessMode,
            crate::models::enums::MachineIdentifierType,
            crate::models::enums::TerminalLifecycle,
            crate::models::enums::TerminalStatus,
            // Monitoring
            crate::models::health::TerminalHealth,
            crate::models::health::StoreHealthSummary,
            crate::models::health::HealthCheckRun,
            crate::models::health::LastCheckResponse,
            monitoring::GeneratedCodeResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Service health endpoints"),
        (name = "terminals", description = "Terminal registry and heartbeats"),
        (name = "monitoring", description = "Terminal health and code generation")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
