//! E2E tests: POST /auth/google and GET /auth/me.

use actix_web::test;
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use serde_json::{Value, json};
use street_reports_lib::services::session;

use super::mock_google_provider::TestIdTokenClaims;
use super::test_helpers::*;

#[actix_rt::test]
async fn test_login_returns_session_and_profile() {
    let google_id = "109876543210987654321";
    let existing = user_row(google_id, "maria.gomez@example.com", "citizen");
    let conn = MockDatabase::new(DatabaseBackend::Postgres)
        // conflict-aware insert, then the stored row by google_id
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        .append_query_results([vec![existing.clone()]])
        .into_connection();
    let app = create_test_app(conn, &[]).await;

    let token = get_mock().issue_token(&TestIdTokenClaims::valid(), &get_primary_key());
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/google")
        .set_json(json!({ "idToken": token }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["expiresIn"], 3600);
    assert_eq!(body["user"]["id"], existing.id.to_string());
    assert_eq!(body["user"]["role"], "citizen");
    assert_eq!(body["profile"]["id"], google_id);
    assert_eq!(body["profile"]["email"], "maria.gomez@example.com");
    assert_eq!(body["profile"]["fullName"], "María Gómez");

    let access_token = body["accessToken"].as_str().unwrap();
    let claims = session::verify_session_token(
        access_token,
        &session_settings(&[]).secret,
    )
    .unwrap();
    assert_eq!(claims.user_id, existing.id);
}

#[actix_rt::test]
async fn test_login_without_id_token_is_400() {
    // No queued results: any database access would fail the request with 500.
    let conn = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let app = create_test_app(conn, &[]).await;

    for body in [json!({}), json!({ "idToken": "" })] {
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/google")
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert_eq!(body["field"], "idToken");
    }
}

#[actix_rt::test]
async fn test_login_with_expired_token_is_401() {
    let conn = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let app = create_test_app(conn, &[]).await;

    let token = get_mock().issue_token(&TestIdTokenClaims::valid().expired(), &get_primary_key());
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/google")
        .set_json(json!({ "idToken": token }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "TOKEN_VERIFICATION_FAILED");
}

#[actix_rt::test]
async fn test_login_with_malformed_json_is_400() {
    let conn = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let app = create_test_app(conn, &[]).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/google")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[actix_rt::test]
async fn test_me_requires_session() {
    let conn = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let app = create_test_app(conn, &[]).await;

    let req = test::TestRequest::get().uri("/api/v1/auth/me").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}
