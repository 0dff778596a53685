//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models, services};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Street Reports Server",
        version = "0.3.0",
        description = "API server for citizen street reports with Google sign-in and admin-managed status"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        api::health::info,
        // Report endpoints
        api::reports::create_report,
        api::reports::list_reports,
        api::reports::list_my_reports,
        api::reports::get_report,
        api::reports::update_report_status,
        // Auth endpoints
        services::auth_google::google_login,
        services::auth_google::get_current_user,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            api::health::ServerInfoResponse,
            // Reports
            models::ReportStatus,
            models::CreateReportRequest,
            models::UpdateReportStatusRequest,
            models::ReportResponse,
            models::ReportListResponse,
            models::ListReportsQuery,
            // Auth
            models::UserRole,
            models::UserResponse,
            models::GoogleProfile,
            models::LoginRequest,
            models::LoginResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Reports", description = "Street report submission and status management"),
        (name = "Auth", description = "Google sign-in and sessions")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add bearer session security scheme.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
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
