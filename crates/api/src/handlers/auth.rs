//! Handlers for the `/auth` session lifecycle (login, refresh, logout, verify).

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;
use warden_session::LoginContext;

use crate::error::AppResult;
use crate::handlers::validate_request;
use crate::middleware::bearer::BearerToken;
use crate::middleware::client::ClientContext;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 128, message = "user_id must be 1-128 characters"))]
    pub user_id: String,
    #[validate(length(min = 1, max = 128, message = "device_id must be 1-128 characters"))]
    pub device_id: String,
    #[serde(default)]
    pub remember_me: bool,
}

/// Access and refresh credentials issued by a login.
#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
}

/// Opaque success indicator for state-changing calls.
#[derive(Debug, Serialize)]
pub struct ResultResponse {
    pub result: &'static str,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub user_id: String,
    pub device_id: String,
    /// Access credential expiry (Unix seconds).
    pub exp: i64,
}

pub(crate) fn login_context(device_id: String, remember: bool, client: ClientContext) -> LoginContext {
    LoginContext {
        device_id,
        remember,
        user_agent: client.user_agent,
        ip_address: client.ip_address,
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /auth/login
///
/// Issue credentials for an identity the calling service has already
/// authenticated.
pub async fn login(
    State(state): State<AppState>,
    client: ClientContext,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<TokenPairResponse>> {
    validate_request(&input)?;

    let ctx = login_context(input.device_id, input.remember_me, client);
    let issued = state.lifecycle.login(&input.user_id, &ctx).await?;

    Ok(Json(TokenPairResponse {
        access_token: issued.access_token,
        refresh_token: issued.refresh_token,
    }))
}

/// POST /auth/refresh
///
/// Exchange the bearer refresh credential for a new access credential.
pub async fn refresh(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> AppResult<Json<AccessTokenResponse>> {
    let refreshed = state.lifecycle.refresh(&token).await?;
    Ok(Json(AccessTokenResponse {
        access_token: refreshed.access_token,
    }))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> AppResult<Json<ResultResponse>> {
    state.lifecycle.logout(&token).await?;
    Ok(Json(ResultResponse {
        result: "logged_out",
    }))
}

/// POST /auth/logout-all
pub async fn logout_all(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> AppResult<Json<ResultResponse>> {
    state.lifecycle.logout_all(&token).await?;
    Ok(Json(ResultResponse {
        result: "logged_out_all",
    }))
}

/// POST /auth/verify
///
/// Succeeds only while the access credential is valid and its device session
/// is still live.
pub async fn verify(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> AppResult<Json<VerifyResponse>> {
    let session = state.lifecycle.verify(&token).await?;
    Ok(Json(VerifyResponse {
        user_id: session.identity_id,
        device_id: session.device_id,
        exp: session.expires_at,
    }))
}
