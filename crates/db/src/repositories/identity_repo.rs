//! Repository for the `auth_identities` table.

use sqlx::PgPool;

use crate::models::identity::{CreateIdentity, Identity};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "identity_id, provider, provider_subject, email, created_at";

/// Provides lookup and idempotent creation of identities.
pub struct IdentityRepo;

impl IdentityRepo {
    /// Find the identity linked to a federated provider subject.
    pub async fn find_by_provider(
        pool: &PgPool,
        provider: &str,
        subject: &str,
    ) -> Result<Option<Identity>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM auth_identities
             WHERE provider = $1 AND provider_subject = $2"
        );
        sqlx::query_as::<_, Identity>(&query)
            .bind(provider)
            .bind(subject)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        identity_id: &str,
    ) -> Result<Option<Identity>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM auth_identities WHERE identity_id = $1");
        sqlx::query_as::<_, Identity>(&query)
            .bind(identity_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert an identity, or return the one that already holds its id or
    /// provider subject.
    ///
    /// Concurrent first logins for the same provider subject race here; the
    /// loser's insert is a no-op and it adopts the winner's row.
    pub async fn create(pool: &PgPool, input: &CreateIdentity) -> Result<Identity, sqlx::Error> {
        let query = format!(
            "INSERT INTO auth_identities (identity_id, provider, provider_subject, email)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT DO NOTHING
             RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, Identity>(&query)
            .bind(&input.identity_id)
            .bind(&input.provider)
            .bind(&input.provider_subject)
            .bind(&input.email)
            .fetch_optional(pool)
            .await?;
        if let Some(identity) = inserted {
            return Ok(identity);
        }

        if let (Some(provider), Some(subject)) = (&input.provider, &input.provider_subject) {
            if let Some(existing) = Self::find_by_provider(pool, provider, subject).await? {
                tracing::debug!(
                    identity_id = %existing.identity_id,
                    provider = %provider,
                    "Identity already linked, reusing existing row"
                );
                return Ok(existing);
            }
        }

        Self::find_by_id(pool, &input.identity_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }
}
