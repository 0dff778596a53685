//! Tests for report submission and lookup.

use actix_web::test;
use sea_orm::{DatabaseBackend, MockDatabase};
use serde_json::{Value, json};
use street_reports_lib::entity::report;
use street_reports_lib::models::{ReportStatus, UserRole, WsEvent};
use street_reports_lib::services::{EventBroadcaster, TransitionPolicy};
use uuid::Uuid;

use super::test_helpers::*;

fn new_report_body() -> Value {
    json!({
        "title": "Semáforo roto",
        "description": "No funciona la luz roja",
        "latitude": -34.6083,
        "longitude": -58.3712,
        "address": "Av. de Mayo 500"
    })
}

#[actix_rt::test]
async fn test_create_report_starts_pending() {
    let user = test_user(UserRole::Citizen);
    let mut stored = report_row(Uuid::now_v7(), ReportStatus::Pending);
    stored.created_by = user.id;
    let conn = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![stored.clone()]])
        .into_connection();

    let broadcaster = EventBroadcaster::new();
    let mut events = broadcaster.subscribe();
    let app = create_test_app(conn, TransitionPolicy::Permissive, broadcaster).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/reports")
        .insert_header(("Authorization", bearer_for(&user)))
        .set_json(new_report_body())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "PENDIENTE");
    assert_eq!(body["createdBy"], user.id.to_string());

    let message = events.try_recv().expect("report created event");
    assert!(matches!(message.event, WsEvent::ReportCreated(_)));
}

#[actix_rt::test]
async fn test_create_report_requires_session() {
    let app = create_test_app(empty_db(), TransitionPolicy::Permissive, EventBroadcaster::new()).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/reports")
        .set_json(new_report_body())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_rt::test]
async fn test_create_report_rejects_bad_coordinates() {
    let app = create_test_app(empty_db(), TransitionPolicy::Permissive, EventBroadcaster::new()).await;
    let mut body = new_report_body();
    body["longitude"] = json!(200.0);

    let req = test::TestRequest::post()
        .uri("/api/v1/reports")
        .insert_header(("Authorization", bearer_for(&test_user(UserRole::Citizen))))
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["field"], "longitude");
}

#[actix_rt::test]
async fn test_get_report() {
    let report_id = Uuid::now_v7();
    let conn = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![report_row(report_id, ReportStatus::InRepair)]])
        .into_connection();
    let app = create_test_app(conn, TransitionPolicy::Permissive, EventBroadcaster::new()).await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/reports/{}", report_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "EN_REPARACION");
    assert_eq!(body["address"], "Av. de Mayo 500");
}

#[actix_rt::test]
async fn test_get_missing_report_is_404() {
    let conn = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<report::Model>::new()])
        .into_connection();
    let app = create_test_app(conn, TransitionPolicy::Permissive, EventBroadcaster::new()).await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/reports/{}", Uuid::now_v7()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "NOT_FOUND");
}

#[actix_rt::test]
async fn test_malformed_report_id_is_400() {
    let app = create_test_app(empty_db(), TransitionPolicy::Permissive, EventBroadcaster::new()).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/reports/not-a-uuid")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_rt::test]
async fn test_list_rejects_unknown_status_filter() {
    let app = create_test_app(empty_db(), TransitionPolicy::Permissive, EventBroadcaster::new()).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/reports?status=abierto")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["field"], "status");
}
