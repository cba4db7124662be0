//! Route definitions for the `/auth` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{auth, devices, oauth};
use crate::state::AppState;

/// Routes mounted at `/auth`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/oauth/login", post(oauth::oauth_login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/logout-all", post(auth::logout_all))
        .route("/verify", post(auth::verify))
        .route("/devices", get(devices::list_devices))
        .route("/devices/{device_id}", delete(devices::revoke_device))
}
