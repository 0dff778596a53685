//! API endpoint modules.

pub mod health;
pub mod openapi;
pub mod reports;
pub mod websocket;

use actix_web::{HttpRequest, error, web};

use crate::error::{AppError, ValidationError};

pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use reports::configure_routes as configure_report_routes;
pub use websocket::configure_routes as configure_websocket_routes;

/// JSON body extractor config: malformed bodies become validation errors.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req: &HttpRequest| {
        let message = match &err {
            error::JsonPayloadError::ContentType => {
                "Content-Type must be application/json".to_string()
            }
            other => format!("Invalid JSON body: {}", other),
        };
        error::Error::from(AppError::from(ValidationError::new("body", message)))
    })
}

/// Query string extractor config.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req: &HttpRequest| {
        error::Error::from(AppError::from(ValidationError::new(
            "query",
            format!("Invalid query string: {}", err),
        )))
    })
}

/// Path extractor config: a malformed report id is a 400.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req: &HttpRequest| {
        error::Error::from(AppError::from(ValidationError::new(
            "id",
            format!("Invalid path parameter: {}", err),
        )))
    })
}
