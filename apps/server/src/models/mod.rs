//! Domain models for the street reports server.

pub mod profile;
pub mod report;
pub mod user;
pub mod ws_event;

// Re-export commonly used types
pub use profile::{GoogleIdTokenClaims, GoogleProfile};
pub use report::{
    CreateReportRequest, ListReportsQuery, ReportListResponse, ReportResponse, ReportStatus,
    STATUS_VALIDATION_MESSAGE, UpdateReportStatusRequest,
};
pub use user::{
    AuthenticatedUser, LoginRequest, LoginResponse, SessionClaims, User, UserResponse, UserRole,
};
pub use ws_event::{WsEvent, WsEventMessage};

use crate::error::ValidationError;

/// Collapse derive-based validation errors into the first failing field.
///
/// Fields are visited in name order so the reported field is stable, and the
/// name is given in the camelCase used on the wire.
pub(crate) fn first_validation_error(errors: validator::ValidationErrors) -> ValidationError {
    let mut fields: Vec<(String, String)> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let field = field.to_string();
            let message = errs
                .first()
                .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| format!("{} is invalid", to_camel_case(&field)));
            (field, message)
        })
        .collect();
    fields.sort();

    match fields.into_iter().next() {
        Some((field, message)) => ValidationError::new(to_camel_case(&field), message),
        None => ValidationError::new("body", "Invalid request body"),
    }
}

fn to_camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper_next = false;
    for c in snake.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
