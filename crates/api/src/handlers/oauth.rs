//! Handler for federated (OAuth / OIDC) login.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use validator::Validate;
use warden_session::FederatedClaims;

use crate::error::{AppError, AppResult};
use crate::federated::FederatedError;
use crate::handlers::auth::{login_context, TokenPairResponse};
use crate::handlers::validate_request;
use crate::middleware::client::ClientContext;
use crate::state::AppState;

const GOOGLE: &str = "google";

/// Request body for `POST /auth/oauth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct OAuthLoginRequest {
    #[validate(length(min = 1, max = 32, message = "provider is required"))]
    pub provider: String,
    #[validate(length(min = 1, message = "id_token is required"))]
    pub id_token: String,
    #[validate(length(min = 1, max = 128, message = "device_id must be 1-128 characters"))]
    pub device_id: String,
    #[serde(default)]
    pub remember_me: bool,
}

/// POST /auth/oauth/login
///
/// Verify the provider ID token, link or reuse the internal identity, then
/// log it in on the given device.
pub async fn oauth_login(
    State(state): State<AppState>,
    client: ClientContext,
    Json(input): Json<OAuthLoginRequest>,
) -> AppResult<Json<TokenPairResponse>> {
    validate_request(&input)?;

    let verifier = match input.provider.as_str() {
        GOOGLE => state.google_verifier.as_ref(),
        _ => None,
    }
    .ok_or_else(|| AppError::UnsupportedProvider(input.provider.clone()))?;

    let identity = verifier
        .verify(&input.id_token)
        .await
        .map_err(|e| match e {
            FederatedError::Rejected(reason) => AppError::FederatedTokenRejected(reason),
            FederatedError::KeysUnavailable(reason) => {
                tracing::error!(error = %reason, "Identity provider keys unavailable");
                AppError::FederatedTokenRejected("provider keys unavailable".into())
            }
        })?;

    let claims = FederatedClaims {
        provider: input.provider,
        subject: identity.subject,
        email: identity.email,
    };
    let ctx = login_context(input.device_id, input.remember_me, client);
    let issued = state.lifecycle.federated_login(&claims, &ctx).await?;

    Ok(Json(TokenPairResponse {
        access_token: issued.access_token,
        refresh_token: issued.refresh_token,
    }))
}
