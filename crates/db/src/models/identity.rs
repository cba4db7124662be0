//! Identity model and DTOs.

use sqlx::FromRow;
use warden_core::types::{IdentityId, Timestamp};

/// A row from the `auth_identities` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Identity {
    pub identity_id: IdentityId,
    pub provider: Option<String>,
    pub provider_subject: Option<String>,
    pub email: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for creating an identity.
#[derive(Debug, Clone)]
pub struct CreateIdentity {
    pub identity_id: IdentityId,
    pub provider: Option<String>,
    pub provider_subject: Option<String>,
    pub email: Option<String>,
}
