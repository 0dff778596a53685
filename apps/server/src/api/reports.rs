//! Report API handlers.

use actix_web::{HttpResponse, web};
use tracing::info;
use uuid::Uuid;

use crate::auth::SessionAuth;
use crate::db::DbPool;
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::models::{
    CreateReportRequest, ListReportsQuery, ReportListResponse, ReportResponse,
    UpdateReportStatusRequest, WsEvent,
};
use crate::services::EventBroadcaster;
use crate::services::report_status::{self, TransitionPolicy};

/// Submit a new report.
///
/// POST /api/v1/reports
#[utoipa::path(
    post,
    path = "/api/v1/reports",
    tag = "Reports",
    request_body = CreateReportRequest,
    responses(
        (status = 201, description = "Report created", body = ReportResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn create_report(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
    broadcaster: web::Data<EventBroadcaster>,
    body: web::Json<CreateReportRequest>,
) -> AppResult<HttpResponse> {
    body.validate_request()?;

    let report_id = Uuid::now_v7();
    let model = pool
        .insert_report(report_id, auth.user.user_id, &body)
        .await?;
    let report = ReportResponse::from_entity(model);

    info!(
        report_id = %report.id,
        created_by = %auth.user.user_id,
        "Report created"
    );

    broadcaster.publish(WsEvent::report_created(&report));

    Ok(HttpResponse::Created().json(report))
}

/// List reports, newest first.
///
/// GET /api/v1/reports
#[utoipa::path(
    get,
    path = "/api/v1/reports",
    tag = "Reports",
    params(
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("limit" = Option<u64>, Query, description = "Results per page (default 20, max 100)"),
        ("offset" = Option<u64>, Query, description = "Pagination offset")
    ),
    responses(
        (status = 200, description = "List of reports", body = ReportListResponse),
        (status = 400, description = "Unknown status filter", body = ErrorResponse),
    )
)]
pub async fn list_reports(
    pool: web::Data<DbPool>,
    query: web::Query<ListReportsQuery>,
) -> AppResult<HttpResponse> {
    list_page(&pool, &query, None).await
}

/// List the caller's own reports.
///
/// GET /api/v1/reports/mine
#[utoipa::path(
    get,
    path = "/api/v1/reports/mine",
    tag = "Reports",
    params(
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("limit" = Option<u64>, Query, description = "Results per page (default 20, max 100)"),
        ("offset" = Option<u64>, Query, description = "Pagination offset")
    ),
    responses(
        (status = 200, description = "Caller's reports", body = ReportListResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn list_my_reports(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
    query: web::Query<ListReportsQuery>,
) -> AppResult<HttpResponse> {
    list_page(&pool, &query, Some(auth.user.user_id)).await
}

async fn list_page(
    pool: &DbPool,
    query: &ListReportsQuery,
    created_by: Option<Uuid>,
) -> AppResult<HttpResponse> {
    let status = query.status_filter()?;
    let limit = query.clamped_limit();

    let (reports, total) = pool
        .list_reports(status, created_by, limit, query.offset)
        .await?;

    Ok(HttpResponse::Ok().json(ReportListResponse {
        reports: reports
            .into_iter()
            .map(ReportResponse::from_entity)
            .collect(),
        total,
        limit,
        offset: query.offset,
    }))
}

/// Get a report by ID.
///
/// GET /api/v1/reports/{report_id}
#[utoipa::path(
    get,
    path = "/api/v1/reports/{report_id}",
    tag = "Reports",
    params(
        ("report_id" = Uuid, Path, description = "Report UUID")
    ),
    responses(
        (status = 200, description = "Report details", body = ReportResponse),
        (status = 404, description = "Report not found", body = ErrorResponse),
    )
)]
pub async fn get_report(pool: web::Data<DbPool>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let report_id = path.into_inner();

    let report = pool
        .get_report_by_id(report_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Report {}", report_id)))?;

    Ok(HttpResponse::Ok().json(ReportResponse::from_entity(report)))
}

/// Change a report's status (admin only).
///
/// PATCH /api/v1/reports/{report_id}/status
///
/// The body is decoded before anything else, so an unknown status is a 400
/// without touching the database. Requesting the current status succeeds
/// without a write or an event.
#[utoipa::path(
    patch,
    path = "/api/v1/reports/{report_id}/status",
    tag = "Reports",
    params(
        ("report_id" = Uuid, Path, description = "Report UUID")
    ),
    request_body = UpdateReportStatusRequest,
    responses(
        (status = 200, description = "Report after the change", body = ReportResponse),
        (status = 400, description = "Status outside the accepted set", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "Report not found", body = ErrorResponse),
        (status = 409, description = "Transition refused by policy", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn update_report_status(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
    broadcaster: web::Data<EventBroadcaster>,
    policy: web::Data<TransitionPolicy>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateReportStatusRequest>,
) -> AppResult<HttpResponse> {
    let report_id = path.into_inner();
    let requested = body.validate()?;

    let write = report_status::change_report_status(
        &pool,
        report_id,
        requested,
        &auth.user,
        *policy.get_ref(),
    )
    .await?;

    if write.changed() {
        broadcaster.publish(WsEvent::report_status_changed(
            report_id,
            write.previous,
            write.current,
            auth.user.user_id,
        ));
    }

    Ok(HttpResponse::Ok().json(ReportResponse::from_entity(write.report)))
}

/// Configure report routes.
///
/// `/reports/mine` is registered ahead of `/reports/{report_id}`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/reports")
            .route(web::get().to(list_reports))
            .route(web::post().to(create_report)),
    )
    .service(web::resource("/reports/mine").route(web::get().to(list_my_reports)))
    .service(web::resource("/reports/{report_id}").route(web::get().to(get_report)))
    .service(
        web::resource("/reports/{report_id}/status")
            .route(web::patch().to(update_report_status)),
    );
}
