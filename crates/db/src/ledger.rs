//! The ledger interface consumed by the session lifecycle.
//!
//! [`PgLedger`] is the production implementation over the repositories in
//! this crate; [`crate::MemoryLedger`] implements the same trait in memory.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::device_session::{DeviceSession, UpsertDeviceSession};
use crate::models::identity::{CreateIdentity, Identity};
use crate::repositories::{DeviceSessionRepo, IdentityRepo};

/// Failure of a ledger call.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Identity linkage and the device-session audit trail.
#[async_trait]
pub trait SessionLedger: Send + Sync {
    async fn find_identity_by_provider(
        &self,
        provider: &str,
        subject: &str,
    ) -> Result<Option<Identity>, LedgerError>;

    /// Idempotent: an existing identity with the same id or provider subject
    /// is returned instead of an error.
    async fn create_identity(&self, input: &CreateIdentity) -> Result<Identity, LedgerError>;

    async fn upsert_device_session(
        &self,
        input: &UpsertDeviceSession,
    ) -> Result<DeviceSession, LedgerError>;

    async fn touch_last_used(&self, identity_id: &str, device_id: &str)
        -> Result<bool, LedgerError>;

    async fn revoke_device(&self, identity_id: &str, device_id: &str) -> Result<bool, LedgerError>;

    async fn revoke_all_devices(&self, identity_id: &str) -> Result<u64, LedgerError>;

    /// Newest issuance first.
    async fn list_devices(&self, identity_id: &str) -> Result<Vec<DeviceSession>, LedgerError>;

    /// Non-revoked and not yet expired.
    async fn count_active_devices(&self, identity_id: &str) -> Result<i64, LedgerError>;
}

/// PostgreSQL-backed ledger.
#[derive(Debug, Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SessionLedger for PgLedger {
    async fn find_identity_by_provider(
        &self,
        provider: &str,
        subject: &str,
    ) -> Result<Option<Identity>, LedgerError> {
        Ok(IdentityRepo::find_by_provider(&self.pool, provider, subject).await?)
    }

    async fn create_identity(&self, input: &CreateIdentity) -> Result<Identity, LedgerError> {
        Ok(IdentityRepo::create(&self.pool, input).await?)
    }

    async fn upsert_device_session(
        &self,
        input: &UpsertDeviceSession,
    ) -> Result<DeviceSession, LedgerError> {
        Ok(DeviceSessionRepo::upsert(&self.pool, input).await?)
    }

    async fn touch_last_used(
        &self,
        identity_id: &str,
        device_id: &str,
    ) -> Result<bool, LedgerError> {
        Ok(DeviceSessionRepo::touch_last_used(&self.pool, identity_id, device_id).await?)
    }

    async fn revoke_device(&self, identity_id: &str, device_id: &str) -> Result<bool, LedgerError> {
        Ok(DeviceSessionRepo::revoke(&self.pool, identity_id, device_id).await?)
    }

    async fn revoke_all_devices(&self, identity_id: &str) -> Result<u64, LedgerError> {
        Ok(DeviceSessionRepo::revoke_all_for_identity(&self.pool, identity_id).await?)
    }

    async fn list_devices(&self, identity_id: &str) -> Result<Vec<DeviceSession>, LedgerError> {
        Ok(DeviceSessionRepo::list_for_identity(&self.pool, identity_id).await?)
    }

    async fn count_active_devices(&self, identity_id: &str) -> Result<i64, LedgerError> {
        Ok(DeviceSessionRepo::count_active(&self.pool, identity_id).await?)
    }
}
