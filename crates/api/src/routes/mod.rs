pub mod auth;
pub mod health;

use axum::middleware;
use axum::Router;

use crate::middleware::service_key::require_service_key;
use crate::state::AppState;

/// Build the application route tree.
///
/// ```text
/// /health                          service health (public)
///
/// /auth/login                      login                     (service key)
/// /auth/oauth/login                federated login           (service key)
/// /auth/refresh                    refresh credential -> access
/// /auth/logout                     revoke this device
/// /auth/logout-all                 revoke every device
/// /auth/verify                     session check
/// /auth/devices                    list devices
/// /auth/devices/{device_id}        revoke one device (DELETE)
/// ```
///
/// The service-key check applies to every `/auth` route when configured.
pub fn app_routes(state: &AppState) -> Router<AppState> {
    Router::new().merge(health::router()).nest(
        "/auth",
        auth::router().route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_service_key,
        )),
    )
}
