//! Google sign-in routes.
//!
//! Endpoints:
//! 1. POST /auth/google: verify a Google ID token, upsert the user, issue a session token
//! 2. GET /auth/me: return the current user from the session token

use actix_web::{HttpResponse, get, post, web};
use tracing::info;

use crate::auth::SessionAuth;
use crate::config::SessionSettings;
use crate::db::DbPool;
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::models::{LoginRequest, LoginResponse, UserResponse};
use crate::services::google_identity::GoogleIdentityVerifier;
use crate::services::session;

/// Configure Google sign-in routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(google_login).service(get_current_user);
}

/// Sign in with a Google ID token.
///
/// POST /api/v1/auth/google
#[utoipa::path(
    post,
    path = "/api/v1/auth/google",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, description = "idToken missing", body = ErrorResponse),
        (status = 401, description = "ID token rejected", body = ErrorResponse)
    )
)]
#[post("/auth/google")]
pub async fn google_login(
    body: web::Json<LoginRequest>,
    verifier: web::Data<GoogleIdentityVerifier>,
    settings: web::Data<SessionSettings>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let profile = verifier.verify(body.id_token.as_deref()).await?;

    let grant_admin = settings
        .admin_emails
        .iter()
        .any(|email| email.eq_ignore_ascii_case(profile.email()));

    let user = crate::db::users::upsert_from_profile(pool.connection(), &profile, grant_admin)
        .await?;

    info!(
        user_id = %user.id,
        role = %user.role,
        "User signed in with Google"
    );

    let access_token = session::create_session_token(&user, &settings)?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        token_type: "Bearer",
        expires_in: settings.ttl_secs,
        user: user.into(),
        profile,
    }))
}

/// Get the signed-in user.
///
/// GET /api/v1/auth/me
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[get("/auth/me")]
pub async fn get_current_user(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let user = crate::db::users::find_by_id(pool.connection(), auth.user.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}
