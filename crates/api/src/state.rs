use std::sync::Arc;

use warden_session::SessionLifecycle;

use crate::config::ServerConfig;
use crate::federated::IdTokenVerifier;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<SessionLifecycle>,
    pub config: Arc<ServerConfig>,
    /// Google ID-token verifier; `None` disables federated login.
    pub google_verifier: Option<Arc<dyn IdTokenVerifier>>,
}
