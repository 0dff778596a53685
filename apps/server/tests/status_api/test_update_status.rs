//! Tests for PATCH /reports/{id}/status.

use actix_web::test;
use serde_json::{Value, json};
use street_reports_lib::models::{ReportStatus, UserRole, WsEvent};
use street_reports_lib::services::{EventBroadcaster, TransitionPolicy};
use tokio::sync::broadcast::error::TryRecvError;
use uuid::Uuid;

use super::test_helpers::*;

fn patch_status(id: Uuid, bearer: Option<&str>, body: Value) -> actix_http::Request {
    let mut req = test::TestRequest::patch()
        .uri(&format!("/api/v1/reports/{}/status", id))
        .set_json(body);
    if let Some(bearer) = bearer {
        req = req.insert_header(("Authorization", bearer));
    }
    req.to_request()
}

#[actix_rt::test]
async fn test_citizen_gets_403_and_nothing_is_read() {
    let app = create_test_app(empty_db(), TransitionPolicy::Permissive, EventBroadcaster::new()).await;
    let citizen = bearer_for(&test_user(UserRole::Citizen));

    for status in ["PENDIENTE", "EN_REPARACION", "RESUELTO", "DESCARTADO"] {
        let req = patch_status(Uuid::now_v7(), Some(&citizen), json!({ "status": status }));
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 403, "citizen requesting {status}");

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "FORBIDDEN");
    }
}

#[actix_rt::test]
async fn test_demoted_admin_session_gets_403() {
    // The token still says admin; the stored role was revoked since.
    let conn = sea_orm::MockDatabase::new(sea_orm::DatabaseBackend::Postgres)
        .append_query_results([vec![user_row(UserRole::Citizen)]])
        .into_connection();
    let app = create_test_app(conn, TransitionPolicy::Permissive, EventBroadcaster::new()).await;

    let req = patch_status(
        Uuid::now_v7(),
        Some(&bearer_for(&test_user(UserRole::Admin))),
        json!({ "status": "RESUELTO" }),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "FORBIDDEN");
}

#[actix_rt::test]
async fn test_lowercase_status_is_400_before_database() {
    let app = create_test_app(empty_db(), TransitionPolicy::Permissive, EventBroadcaster::new()).await;
    let admin = bearer_for(&test_user(UserRole::Admin));

    for body in [
        json!({ "status": "resuelto" }),
        json!({}),
        json!({ "status": "CLOSED" }),
        json!({ "status": null }),
        json!({ "status": 5 }),
        json!({ "status": true }),
        json!({ "status": ["RESUELTO"] }),
    ] {
        let req = patch_status(Uuid::now_v7(), Some(&admin), body);
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "VALIDATION_ERROR", "{body}");
        assert_eq!(body["field"], "status");
        assert_eq!(
            body["message"],
            "El estado debe ser: PENDIENTE, EN_REPARACION, RESUELTO o DESCARTADO"
        );
    }
}

#[actix_rt::test]
async fn test_admin_moves_pending_to_in_repair() {
    let report_id = Uuid::now_v7();
    let broadcaster = EventBroadcaster::new();
    let mut events = broadcaster.subscribe();
    let app = create_test_app(
        status_change_db(report_row(report_id, ReportStatus::Pending)),
        TransitionPolicy::Permissive,
        broadcaster,
    )
    .await;

    let admin_user = test_user(UserRole::Admin);
    let req = patch_status(
        report_id,
        Some(&bearer_for(&admin_user)),
        json!({ "status": "EN_REPARACION" }),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["id"], report_id.to_string());
    assert_eq!(body["status"], "EN_REPARACION");
    assert!(body["statusChangedAt"].is_string());

    let message = events.try_recv().expect("status change event");
    match message.event {
        WsEvent::ReportStatusChanged(payload) => {
            assert_eq!(payload.report_id, report_id);
            assert_eq!(payload.previous_status, ReportStatus::Pending);
            assert_eq!(payload.status, ReportStatus::InRepair);
            assert_eq!(payload.changed_by, admin_user.id);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[actix_rt::test]
async fn test_canonical_alias_accepted() {
    let report_id = Uuid::now_v7();
    let app = create_test_app(
        status_change_db(report_row(report_id, ReportStatus::InRepair)),
        TransitionPolicy::Permissive,
        EventBroadcaster::new(),
    )
    .await;

    let req = patch_status(
        report_id,
        Some(&bearer_for(&test_user(UserRole::Admin))),
        json!({ "status": "RESOLVED" }),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "RESUELTO");
}

#[actix_rt::test]
async fn test_same_status_succeeds_without_event() {
    let report_id = Uuid::now_v7();
    let broadcaster = EventBroadcaster::new();
    let mut events = broadcaster.subscribe();
    let app = create_test_app(
        status_change_db(report_row(report_id, ReportStatus::Resolved)),
        TransitionPolicy::Strict,
        broadcaster,
    )
    .await;

    let req = patch_status(
        report_id,
        Some(&bearer_for(&test_user(UserRole::Admin))),
        json!({ "status": "RESUELTO" }),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "RESUELTO");
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[actix_rt::test]
async fn test_strict_policy_refuses_reopening() {
    let report_id = Uuid::now_v7();
    let app = create_test_app(
        status_change_db(report_row(report_id, ReportStatus::Discarded)),
        TransitionPolicy::Strict,
        EventBroadcaster::new(),
    )
    .await;

    let req = patch_status(
        report_id,
        Some(&bearer_for(&test_user(UserRole::Admin))),
        json!({ "status": "PENDIENTE" }),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "INVALID_TRANSITION");
}

#[actix_rt::test]
async fn test_permissive_policy_allows_reopening() {
    let report_id = Uuid::now_v7();
    let app = create_test_app(
        status_change_db(report_row(report_id, ReportStatus::Resolved)),
        TransitionPolicy::Permissive,
        EventBroadcaster::new(),
    )
    .await;

    let req = patch_status(
        report_id,
        Some(&bearer_for(&test_user(UserRole::Admin))),
        json!({ "status": "PENDIENTE" }),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}

#[actix_rt::test]
async fn test_missing_report_is_404() {
    let conn = sea_orm::MockDatabase::new(sea_orm::DatabaseBackend::Postgres)
        .append_query_results([vec![user_row(UserRole::Admin)]])
        .append_query_results([Vec::<street_reports_lib::entity::report::Model>::new()])
        .into_connection();
    let app = create_test_app(conn, TransitionPolicy::Permissive, EventBroadcaster::new()).await;

    let req = patch_status(
        Uuid::now_v7(),
        Some(&bearer_for(&test_user(UserRole::Admin))),
        json!({ "status": "RESUELTO" }),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_rt::test]
async fn test_missing_session_is_401() {
    let app = create_test_app(empty_db(), TransitionPolicy::Permissive, EventBroadcaster::new()).await;

    let req = patch_status(Uuid::now_v7(), None, json!({ "status": "RESUELTO" }));
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let req = patch_status(
        Uuid::now_v7(),
        Some("Bearer forged.token.value"),
        json!({ "status": "RESUELTO" }),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}
