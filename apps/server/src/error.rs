//! Domain error types for the street reports server.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use actix_web::{HttpResponse, ResponseError};
use std::fmt;

use crate::models::ReportStatus;

/// A rejected client input, tagged with the offending field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Why an ID token was not accepted.
///
/// The Display text is what clients see; the underlying detail is logged
/// where the failure is detected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenVerificationError {
    #[error("Token is malformed")]
    Malformed,
    #[error("Token was signed with an unknown key")]
    UnknownKey,
    #[error("Token signature is invalid")]
    InvalidSignature,
    #[error("Token has expired")]
    Expired,
    #[error("Token issuer is not trusted")]
    InvalidIssuer,
    #[error("Token was not issued for this application")]
    InvalidAudience,
    #[error("Token is missing required claim '{0}'")]
    MissingClaim(&'static str),
    #[error("Token email address is not verified")]
    UnverifiedEmail,
    #[error("Issuer keys are unavailable")]
    KeyFetch(String),
    #[error("Token verification timed out")]
    Timeout,
}

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid input data
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// ID token rejected by the identity verifier
    #[error("Token verification failed: {0}")]
    TokenVerification(#[from] TokenVerificationError),

    /// Missing or invalid session
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but lacking the required capability
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Status change rejected by the transition policy
    #[error("Cannot change report status from {from} to {to}")]
    InvalidTransition { from: ReportStatus, to: ReportStatus },

    /// Unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable error code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::TokenVerification(_) => "TOKEN_VERIFICATION_FAILED",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::TokenVerification(_) | AppError::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (message, field) = match self {
            AppError::Database(err_str) => {
                tracing::error!("Database error: {}", err_str);
                ("An internal database error occurred".to_string(), None)
            }
            AppError::Internal(err_str) => {
                tracing::error!("Internal error: {}", err_str);
                ("An internal error occurred".to_string(), None)
            }
            AppError::Validation(err) => (err.message.clone(), Some(err.field.clone())),
            _ => (self.to_string(), None),
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.code().to_string(),
            message,
            field,
        })
    }
}

/// Error response body matching OpenAPI schema.
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// Offending request field, present for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(ValidationError::new(
            "body",
            format!("JSON parsing error: {}", err),
        ))
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::Validation(ValidationError::new("id", format!("Invalid UUID: {}", err)))
    }
}
