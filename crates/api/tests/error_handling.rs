//! Error rendering, extractor rejections and the service-key gate.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, build_test_app_with, get, login, post_auth, post_json,
    test_config, SERVICE_KEY,
};
use warden_core::credential::CredentialKind;

#[tokio::test]
async fn missing_bearer_is_unauthorized() {
    let app = build_test_app();
    let response = post_json(&app.router, "/auth/logout", serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["code"], "MISSING_CREDENTIAL");
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn garbage_credential_is_invalid() {
    let app = build_test_app();
    let response = post_auth(&app.router, "/auth/verify", "not.a.jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "INVALID_CREDENTIAL");
}

#[tokio::test]
async fn refresh_credential_cannot_verify_a_session() {
    let app = build_test_app();
    let (access, refresh) = login(&app.router, "u1", "d1").await;

    let response = post_auth(&app.router, "/auth/verify", &refresh).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "INVALID_CREDENTIAL");

    let response = post_auth(&app.router, "/auth/refresh", &access).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "INVALID_CREDENTIAL");
}

#[tokio::test]
async fn expired_access_credential_is_rejected() {
    let app = build_test_app();
    login(&app.router, "u1", "d1").await;
    let issued_long_ago = chrono::Utc::now().timestamp() - 10_000;
    let stale = app
        .codec
        .mint_at(CredentialKind::Access, "u1", "d1", 900, issued_long_ago)
        .unwrap();

    let response = post_auth(&app.router, "/auth/verify", &stale.token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "INVALID_CREDENTIAL");
}

#[tokio::test]
async fn invalid_login_body_is_a_bad_request() {
    let app = build_test_app();
    let body = serde_json::json!({ "user_id": "u1", "device_id": "" });
    let response = post_json(&app.router, "/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert!(json["error"].as_str().unwrap().contains("device_id"));

    let too_long = serde_json::json!({ "user_id": "u".repeat(129), "device_id": "d1" });
    let response = post_json(&app.router, "/auth/login", too_long).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn service_key_gates_auth_routes_only() {
    let mut config = test_config();
    config.service_api_key = Some(SERVICE_KEY.to_string());
    let app = build_test_app_with(config);

    let body = serde_json::json!({ "user_id": "u1", "device_id": "d1" });
    let response = post_json(&app.router, "/auth/login", body.clone()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "SERVICE_KEY_REJECTED");

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header("content-type", "application/json")
        .header("x-service-key", SERVICE_KEY)
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();
    let response = common::send(&app.router, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let health = get(&app.router, "/health").await;
    assert_eq!(health.status(), StatusCode::OK);
}
