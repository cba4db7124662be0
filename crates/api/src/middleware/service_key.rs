//! Shared-secret gate for calling services.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use warden_core::hashing::sha256_hex;

use crate::error::AppError;
use crate::state::AppState;

const X_SERVICE_KEY: &str = "x-service-key";

/// Reject requests whose `X-Service-Key` does not match `SERVICE_API_KEY`.
///
/// A no-op when no service key is configured.
pub async fn require_service_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = state.config.service_api_key.as_deref() {
        let presented = request
            .headers()
            .get(X_SERVICE_KEY)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::ServiceKeyRejected)?;

        // Digests, not raw keys, so timing does not leak a matching prefix.
        if sha256_hex(presented.as_bytes()) != sha256_hex(expected.as_bytes()) {
            tracing::warn!("Rejected request with invalid service key");
            return Err(AppError::ServiceKeyRejected);
        }
    }

    Ok(next.run(request).await)
}
