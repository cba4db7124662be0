#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use warden_core::admission::AdmissionPolicy;
use warden_core::credential::CredentialCodec;
use warden_core::lifetimes::SessionLifetimes;
use warden_db::MemoryLedger;
use warden_session::{MemorySessionIndex, SessionLifecycle};

use warden_api::config::{ServerConfig, SessionConfig, StoreBackend};
use warden_api::federated::{FederatedError, IdTokenVerifier, VerifiedIdentity};
use warden_api::routes;
use warden_api::state::AppState;

pub const TEST_SECRET: &str = "api-test-secret-0123456789abcdef";
pub const SERVICE_KEY: &str = "svc-key-123";

/// Build a test `ServerConfig` backed by in-memory stores.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        service_api_key: None,
        google_client_id: None,
        session: SessionConfig {
            jwt_secret: TEST_SECRET.to_string(),
            lifetimes: SessionLifetimes::default(),
            max_devices: 5,
            backend: StoreBackend::Memory,
        },
    }
}

/// Accepts ID tokens of the form `valid:<subject>:<email>`.
pub struct StubVerifier;

#[async_trait]
impl IdTokenVerifier for StubVerifier {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, FederatedError> {
        match id_token.split(':').collect::<Vec<_>>().as_slice() {
            ["valid", subject, email] => Ok(VerifiedIdentity {
                subject: subject.to_string(),
                email: Some(email.to_string()),
            }),
            _ => Err(FederatedError::Rejected("stub rejects this token".into())),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub index: Arc<MemorySessionIndex>,
    pub ledger: Arc<MemoryLedger>,
    pub codec: CredentialCodec,
}

pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config())
}

/// Build the full application router with the production middleware stack
/// over in-memory stores and the stub Google verifier.
pub fn build_test_app_with(config: ServerConfig) -> TestApp {
    let codec = CredentialCodec::from_secret(config.session.jwt_secret.as_bytes()).unwrap();
    let index = Arc::new(MemorySessionIndex::new(AdmissionPolicy::new(
        config.session.max_devices,
    )));
    let ledger = Arc::new(MemoryLedger::new());
    let lifecycle = SessionLifecycle::new(
        codec.clone(),
        config.session.lifetimes,
        index.clone(),
        ledger.clone(),
    );

    let state = AppState {
        lifecycle: Arc::new(lifecycle),
        config: Arc::new(config),
        google_verifier: Some(Arc::new(StubVerifier)),
    };

    let request_id_header = HeaderName::from_static("x-request-id");

    let router = Router::new()
        .merge(routes::app_routes(&state))
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .with_state(state);

    TestApp {
        router,
        index,
        ledger,
        codec,
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .header("user-agent", "warden-tests/1.0")
        .header("x-forwarded-for", "198.51.100.4")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn with_token(app: &Router, method: Method, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_auth(app: &Router, uri: &str, token: &str) -> Response {
    with_token(app, Method::POST, uri, token).await
}

pub async fn get_auth(app: &Router, uri: &str, token: &str) -> Response {
    with_token(app, Method::GET, uri, token).await
}

pub async fn delete_auth(app: &Router, uri: &str, token: &str) -> Response {
    with_token(app, Method::DELETE, uri, token).await
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Log `user_id` in on `device_id` and return `(access, refresh)`.
pub async fn login(app: &Router, user_id: &str, device_id: &str) -> (String, String) {
    let body = serde_json::json!({ "user_id": user_id, "device_id": device_id });
    let response = post_json(app, "/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    (
        json["access_token"].as_str().unwrap().to_string(),
        json["refresh_token"].as_str().unwrap().to_string(),
    )
}
