use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_core::admission::AdmissionPolicy;
use warden_core::credential::CredentialCodec;
use warden_db::{MemoryLedger, PgLedger, SessionLedger};
use warden_session::{MemorySessionIndex, RedisSessionIndex, SessionIndex, SessionLifecycle};

use warden_api::config::{ServerConfig, StoreBackend};
use warden_api::federated::{GoogleIdTokenVerifier, IdTokenVerifier};
use warden_api::routes;
use warden_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warden_api=debug,warden_session=debug,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        max_devices = config.session.max_devices,
        "Loaded server configuration"
    );

    // --- Session stores ---
    let policy = AdmissionPolicy::new(config.session.max_devices);
    let (index, ledger): (Arc<dyn SessionIndex>, Arc<dyn SessionLedger>) =
        match &config.session.backend {
            StoreBackend::External {
                redis_url,
                database_url,
                database_max_connections,
            } => {
                let pool = warden_db::create_pool(database_url, *database_max_connections)
                    .await
                    .expect("Failed to connect to database");
                tracing::info!("Database connection pool created");

                warden_db::health_check(&pool)
                    .await
                    .expect("Database health check failed");
                warden_db::run_migrations(&pool)
                    .await
                    .expect("Failed to run database migrations");
                tracing::info!("Database migrations applied");

                let index = RedisSessionIndex::connect(redis_url, policy)
                    .await
                    .expect("Failed to connect to Redis");
                index.ping().await.expect("Redis health check failed");
                tracing::info!("Redis session index connected");

                (
                    Arc::new(index) as Arc<dyn SessionIndex>,
                    Arc::new(PgLedger::new(pool)) as Arc<dyn SessionLedger>,
                )
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory session stores; state is lost on restart");
                (
                    Arc::new(MemorySessionIndex::new(policy)) as Arc<dyn SessionIndex>,
                    Arc::new(MemoryLedger::new()) as Arc<dyn SessionLedger>,
                )
            }
        };

    let codec = CredentialCodec::from_secret(config.session.jwt_secret.as_bytes())
        .expect("JWT_SECRET must be a usable signing key");
    let lifecycle = SessionLifecycle::new(codec, config.session.lifetimes, index, ledger);

    // --- Federated identity ---
    let google_verifier = config.google_client_id.as_ref().map(|client_id| {
        Arc::new(GoogleIdTokenVerifier::new(client_id.clone())) as Arc<dyn IdTokenVerifier>
    });
    if google_verifier.is_none() {
        tracing::info!("GOOGLE_CLIENT_ID not set; federated login disabled");
    }

    // --- App state ---
    let state = AppState {
        lifecycle: Arc::new(lifecycle),
        config: Arc::new(config.clone()),
        google_verifier,
    };

    // --- Request ID header name ---
    let request_id_header = HeaderName::from_static("x-request-id");

    // --- Router ---
    let app = Router::new()
        .merge(routes::app_routes(&state))
        // -- Middleware stack (applied bottom-up) --
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .with_state(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
