//! Device session (refresh-credential audit row) model and DTOs.

use sqlx::FromRow;
use warden_core::types::{DeviceId, IdentityId, Timestamp};

/// A row from the `refresh_sessions` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct DeviceSession {
    pub identity_id: IdentityId,
    pub device_id: DeviceId,
    /// SHA-256 hex of the refresh credential.
    pub token_hash: String,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    /// Unset until the refresh credential is first exchanged.
    pub last_used_at: Option<Timestamp>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub revoked: bool,
}

impl DeviceSession {
    /// Not revoked and not yet expired at `now`.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        !self.revoked && self.expires_at > now
    }
}

/// DTO for inserting or replacing the session of one device.
#[derive(Debug, Clone)]
pub struct UpsertDeviceSession {
    pub identity_id: IdentityId,
    pub device_id: DeviceId,
    pub token_hash: String,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}
