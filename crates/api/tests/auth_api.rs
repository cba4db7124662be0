//! HTTP-level tests for the `/auth` session lifecycle endpoints.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, delete_auth, get, get_auth, login, post_auth, post_json,
};
use warden_core::credential::CredentialKind;
use warden_db::SessionLedger;

#[tokio::test]
async fn health_reports_ok() {
    let app = build_test_app();
    let response = get(&app.router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn login_issues_token_pair_and_records_client() {
    let app = build_test_app();
    let (access, refresh) = login(&app.router, "u1", "d1").await;

    let access_claims = app
        .codec
        .verify_kind(&access, CredentialKind::Access)
        .unwrap();
    assert_eq!(access_claims.exp - access_claims.iat, 900);
    let refresh_claims = app
        .codec
        .verify_kind(&refresh, CredentialKind::Refresh)
        .unwrap();
    assert_eq!(refresh_claims.exp - refresh_claims.iat, 604_800);

    let row = app.ledger.device_session("u1", "d1").await.unwrap();
    assert_eq!(row.user_agent.as_deref(), Some("warden-tests/1.0"));
    assert_eq!(row.ip_address.as_deref(), Some("198.51.100.4"));
}

#[tokio::test]
async fn remember_me_extends_refresh_lifetime() {
    let app = build_test_app();
    let body = serde_json::json!({ "user_id": "u1", "device_id": "d1", "remember_me": true });
    let response = post_json(&app.router, "/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let claims = app
        .codec
        .verify_kind(json["refresh_token"].as_str().unwrap(), CredentialKind::Refresh)
        .unwrap();
    assert_eq!(claims.exp - claims.iat, 2_592_000);
}

#[tokio::test]
async fn refresh_returns_only_access_token() {
    let app = build_test_app();
    let (_, refresh) = login(&app.router, "u1", "d1").await;

    let response = post_auth(&app.router, "/auth/refresh", &refresh).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["access_token"].is_string());
    assert!(json.get("refresh_token").is_none());
}

#[tokio::test]
async fn sixth_device_evicts_first_over_http() {
    let app = build_test_app();
    let mut refresh_tokens = Vec::new();
    for d in ["d1", "d2", "d3", "d4", "d5", "d6"] {
        refresh_tokens.push(login(&app.router, "u1", d).await.1);
    }

    let evicted = post_auth(&app.router, "/auth/refresh", &refresh_tokens[0]).await;
    assert_eq!(evicted.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(evicted).await["code"], "SESSION_NOT_LIVE");

    let kept = post_auth(&app.router, "/auth/refresh", &refresh_tokens[1]).await;
    assert_eq!(kept.status(), StatusCode::OK);
    assert_eq!(app.ledger.count_active_devices("u1").await.unwrap(), 5);
}

#[tokio::test]
async fn logout_then_verify_fails() {
    let app = build_test_app();
    let (access, refresh) = login(&app.router, "u1", "d1").await;

    let verified = post_auth(&app.router, "/auth/verify", &access).await;
    assert_eq!(verified.status(), StatusCode::OK);
    let json = body_json(verified).await;
    assert_eq!(json["user_id"], "u1");
    assert_eq!(json["device_id"], "d1");
    assert!(json["exp"].is_i64());

    let response = post_auth(&app.router, "/auth/logout", &access).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["result"], "logged_out");

    let after = post_auth(&app.router, "/auth/verify", &access).await;
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(after).await["code"], "SESSION_NOT_LIVE");

    let refreshed = post_auth(&app.router, "/auth/refresh", &refresh).await;
    assert_eq!(refreshed.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_all_revokes_every_device() {
    let app = build_test_app();
    let (access, _) = login(&app.router, "u1", "d1").await;
    let (_, other_refresh) = login(&app.router, "u1", "d2").await;

    let response = post_auth(&app.router, "/auth/logout-all", &access).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["result"], "logged_out_all");

    let refreshed = post_auth(&app.router, "/auth/refresh", &other_refresh).await;
    assert_eq!(refreshed.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.ledger.count_active_devices("u1").await.unwrap(), 0);
}

#[tokio::test]
async fn oauth_login_links_one_identity_per_subject() {
    let app = build_test_app();
    let first = serde_json::json!({
        "provider": "google",
        "id_token": "valid:abc:a@example.com",
        "device_id": "d1",
    });
    let second = serde_json::json!({
        "provider": "google",
        "id_token": "valid:abc:b@example.com",
        "device_id": "d2",
    });

    let a = body_json(post_json(&app.router, "/auth/oauth/login", first).await).await;
    let b = body_json(post_json(&app.router, "/auth/oauth/login", second).await).await;

    let a_claims = app
        .codec
        .verify(a["access_token"].as_str().unwrap())
        .unwrap();
    let b_claims = app
        .codec
        .verify(b["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(a_claims.user_id, b_claims.user_id);
    assert_eq!(app.ledger.identity_count().await, 1);
}

#[tokio::test]
async fn oauth_login_rejects_bad_token_and_unknown_provider() {
    let app = build_test_app();
    let bad_token = serde_json::json!({
        "provider": "google",
        "id_token": "forged",
        "device_id": "d1",
    });
    let response = post_json(&app.router, "/auth/oauth/login", bad_token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "FEDERATED_TOKEN_REJECTED");

    let unknown = serde_json::json!({
        "provider": "myspace",
        "id_token": "valid:abc:a@example.com",
        "device_id": "d1",
    });
    let response = post_json(&app.router, "/auth/oauth/login", unknown).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "UNSUPPORTED_PROVIDER");
    assert_eq!(app.ledger.identity_count().await, 0);
}

#[tokio::test]
async fn devices_are_listed_and_revocable() {
    let app = build_test_app();
    let (access, _) = login(&app.router, "u1", "d1").await;
    login(&app.router, "u1", "d2").await;

    let response = delete_auth(&app.router, "/auth/devices/d2", &access).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["result"], "revoked");

    let response = get_auth(&app.router, "/auth/devices", &access).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let devices = json["devices"].as_array().unwrap();
    assert_eq!(devices.len(), 2);

    let d1 = devices.iter().find(|d| d["device_id"] == "d1").unwrap();
    assert_eq!(d1["current"], true);
    assert_eq!(d1["revoked"], false);
    let d2 = devices.iter().find(|d| d["device_id"] == "d2").unwrap();
    assert_eq!(d2["current"], false);
    assert_eq!(d2["revoked"], true);
    assert!(d2["last_used_at"].is_null());
}
