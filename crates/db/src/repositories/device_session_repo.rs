//! Repository for the `refresh_sessions` table.

use sqlx::PgPool;

use crate::models::device_session::{DeviceSession, UpsertDeviceSession};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "identity_id, device_id, token_hash, issued_at, expires_at, \
                       last_used_at, user_agent, ip_address, revoked";

/// Provides the audit-trail operations for device sessions.
pub struct DeviceSessionRepo;

impl DeviceSessionRepo {
    /// Insert the session for a device, or replace the existing one.
    ///
    /// Replacing clears the revoked flag and `last_used_at`: a re-login
    /// un-revokes the device and has not been used yet.
    pub async fn upsert(
        pool: &PgPool,
        input: &UpsertDeviceSession,
    ) -> Result<DeviceSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO refresh_sessions
                (identity_id, device_id, token_hash, issued_at, expires_at,
                 user_agent, ip_address, revoked, last_used_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, false, NULL)
             ON CONFLICT (identity_id, device_id) DO UPDATE SET
                token_hash   = EXCLUDED.token_hash,
                issued_at    = EXCLUDED.issued_at,
                expires_at   = EXCLUDED.expires_at,
                user_agent   = EXCLUDED.user_agent,
                ip_address   = EXCLUDED.ip_address,
                revoked      = false,
                last_used_at = NULL,
                updated_at   = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeviceSession>(&query)
            .bind(&input.identity_id)
            .bind(&input.device_id)
            .bind(&input.token_hash)
            .bind(input.issued_at)
            .bind(input.expires_at)
            .bind(&input.user_agent)
            .bind(&input.ip_address)
            .fetch_one(pool)
            .await
    }

    /// Stamp `last_used_at` on the non-revoked row. Returns `true` if a row matched.
    pub async fn touch_last_used(
        pool: &PgPool,
        identity_id: &str,
        device_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE refresh_sessions SET last_used_at = NOW(), updated_at = NOW()
             WHERE identity_id = $1 AND device_id = $2 AND revoked = false",
        )
        .bind(identity_id)
        .bind(device_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke one device. Returns `true` if the row was updated.
    pub async fn revoke(
        pool: &PgPool,
        identity_id: &str,
        device_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE refresh_sessions SET revoked = true, updated_at = NOW()
             WHERE identity_id = $1 AND device_id = $2 AND revoked = false",
        )
        .bind(identity_id)
        .bind(device_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke every device of an identity. Returns the count of revoked rows.
    pub async fn revoke_all_for_identity(
        pool: &PgPool,
        identity_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE refresh_sessions SET revoked = true, updated_at = NOW()
             WHERE identity_id = $1 AND revoked = false",
        )
        .bind(identity_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// All device sessions of an identity, newest issuance first.
    pub async fn list_for_identity(
        pool: &PgPool,
        identity_id: &str,
    ) -> Result<Vec<DeviceSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM refresh_sessions
             WHERE identity_id = $1
             ORDER BY issued_at DESC"
        );
        sqlx::query_as::<_, DeviceSession>(&query)
            .bind(identity_id)
            .fetch_all(pool)
            .await
    }

    /// Count sessions that are neither revoked nor expired.
    pub async fn count_active(pool: &PgPool, identity_id: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM refresh_sessions
             WHERE identity_id = $1 AND revoked = false AND expires_at > NOW()",
        )
        .bind(identity_id)
        .fetch_one(pool)
        .await
    }
}
