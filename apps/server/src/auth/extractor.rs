//! Actix-web extractor for session authentication.
//!
//! The bearer token is wrapped in `SecretString` as soon as it is read and is
//! never logged.

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, web};
use secrecy::{ExposeSecret, SecretString};
use std::future::{Ready, ready};
use tracing::debug;

use crate::config::SessionSettings;
use crate::error::ErrorResponse;
use crate::models::AuthenticatedUser;
use crate::services::session;

/// Extract the bearer token from the Authorization header.
fn extract_bearer_token(req: &HttpRequest) -> Option<SecretString> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| SecretString::from(t.to_string()))
}

/// Authentication error for extractors.
#[derive(Debug)]
pub struct AuthError {
    message: String,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::UNAUTHORIZED).json(ErrorResponse {
            error: "UNAUTHORIZED".to_string(),
            message: self.message.clone(),
            field: None,
        })
    }
}

/// Extractor that requires a valid session token.
///
/// ```ignore
/// async fn protected_handler(auth: SessionAuth) -> impl Responder {
///     // auth.user is the signed-in caller
/// }
/// ```
pub struct SessionAuth {
    pub user: AuthenticatedUser,
}

impl FromRequest for SessionAuth {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let settings = match req.app_data::<web::Data<SessionSettings>>() {
            Some(settings) => settings,
            None => {
                return ready(Err(AuthError {
                    message: "Internal configuration error".to_string(),
                }));
            }
        };

        let Some(token) = extract_bearer_token(req) else {
            return ready(Err(AuthError {
                message: "Missing session token. Provide Authorization: Bearer <token>."
                    .to_string(),
            }));
        };

        match session::verify_session_token(token.expose_secret(), &settings.secret) {
            Ok(claims) => ready(Ok(SessionAuth {
                user: claims.into(),
            })),
            Err(e) => {
                debug!("Session token rejected: {}", e);
                ready(Err(AuthError {
                    message: "Invalid or expired session token".to_string(),
                }))
            }
        }
    }
}
