//! Handlers for `/auth/devices`: the caller's device sessions.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use warden_core::types::Timestamp;
use warden_session::DeviceSummary;

use crate::error::{AppError, AppResult};
use crate::handlers::auth::ResultResponse;
use crate::middleware::bearer::BearerToken;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    pub device_id: String,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    pub last_used_at: Option<Timestamp>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub revoked: bool,
    /// The device the calling credential belongs to.
    pub current: bool,
}

impl From<DeviceSummary> for DeviceResponse {
    fn from(d: DeviceSummary) -> Self {
        Self {
            device_id: d.device_id,
            issued_at: d.issued_at,
            expires_at: d.expires_at,
            last_used_at: d.last_used_at,
            user_agent: d.user_agent,
            ip_address: d.ip_address,
            revoked: d.revoked,
            current: d.current,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeviceListResponse {
    pub devices: Vec<DeviceResponse>,
}

/// GET /auth/devices
pub async fn list_devices(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> AppResult<Json<DeviceListResponse>> {
    let devices = state.lifecycle.list_devices(&token).await?;
    Ok(Json(DeviceListResponse {
        devices: devices.into_iter().map(DeviceResponse::from).collect(),
    }))
}

/// DELETE /auth/devices/{device_id}
pub async fn revoke_device(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Path(device_id): Path<String>,
) -> AppResult<Json<ResultResponse>> {
    if device_id.len() > 128 {
        return Err(AppError::BadRequest(
            "device_id must be 1-128 characters".into(),
        ));
    }
    state.lifecycle.revoke_device(&token, &device_id).await?;
    Ok(Json(ResultResponse { result: "revoked" }))
}
