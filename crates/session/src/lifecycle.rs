//! Lifecycle orchestrator: the per-(identity, device) state machine
//! `NONE -> ACTIVE -> REVOKED`, with `ACTIVE -> EXPIRED` implied by the
//! refresh entry leaving the session index.
//!
//! Write order is fixed. Logins write the session index before the ledger;
//! logouts deny in the index before marking the ledger. No step is retried
//! and nothing is rolled back across the two stores: a ledger failure after
//! an index success is reported as [`CoreError::StoreUnavailable`] while the
//! index state stands.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use warden_core::credential::{Claims, CredentialCodec, CredentialKind};
use warden_core::error::CoreError;
use warden_core::hashing::hash_credential;
use warden_core::lifetimes::SessionLifetimes;
use warden_core::types::{DeviceId, IdentityId, Timestamp};
use warden_db::models::device_session::UpsertDeviceSession;
use warden_db::models::identity::CreateIdentity;
use warden_db::{LedgerError, SessionLedger};

use crate::index::{IndexError, SessionIndex};

const INDEX_STORE: &str = "session index";
const LEDGER_STORE: &str = "session ledger";

/// Request metadata for a login, already extracted and validated.
#[derive(Debug, Clone, Default)]
pub struct LoginContext {
    pub device_id: DeviceId,
    /// Use the long refresh lifetime.
    pub remember: bool,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// An identity asserted by a verified federated provider token.
#[derive(Debug, Clone)]
pub struct FederatedClaims {
    pub provider: String,
    pub subject: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IssuedCredentials {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct RefreshedAccess {
    pub access_token: String,
}

/// A live session as seen through an access credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub identity_id: IdentityId,
    pub device_id: DeviceId,
    /// Access credential expiry (Unix seconds).
    pub expires_at: i64,
}

/// One ledger row, flagged when it belongs to the calling device.
#[derive(Debug, Clone)]
pub struct DeviceSummary {
    pub device_id: DeviceId,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    pub last_used_at: Option<Timestamp>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub revoked: bool,
    pub current: bool,
}

/// Drives the credential codec, the session index and the ledger.
///
/// Cheap to share behind an `Arc`; holds no lock across store calls.
pub struct SessionLifecycle {
    codec: CredentialCodec,
    lifetimes: SessionLifetimes,
    index: Arc<dyn SessionIndex>,
    ledger: Arc<dyn SessionLedger>,
}

impl SessionLifecycle {
    pub fn new(
        codec: CredentialCodec,
        lifetimes: SessionLifetimes,
        index: Arc<dyn SessionIndex>,
        ledger: Arc<dyn SessionLedger>,
    ) -> Self {
        Self {
            codec,
            lifetimes,
            index,
            ledger,
        }
    }

    pub fn lifetimes(&self) -> SessionLifetimes {
        self.lifetimes
    }

    /// Issue an access/refresh pair for `identity_id` on `ctx.device_id`,
    /// evicting the least recently active device when the roster is full.
    #[tracing::instrument(skip_all, fields(identity_id = %identity_id, device_id = %ctx.device_id))]
    pub async fn login(
        &self,
        identity_id: &str,
        ctx: &LoginContext,
    ) -> Result<IssuedCredentials, CoreError> {
        let refresh_ttl = self.lifetimes.refresh_ttl_secs(ctx.remember);
        let access = self.codec.mint(
            CredentialKind::Access,
            identity_id,
            &ctx.device_id,
            self.lifetimes.access_ttl_secs,
        )?;
        let refresh = self
            .codec
            .mint(CredentialKind::Refresh, identity_id, &ctx.device_id, refresh_ttl)?;
        let refresh_hash = hash_credential(&refresh.token);

        let admission = self
            .index
            .admit(
                identity_id,
                &ctx.device_id,
                &refresh_hash,
                Duration::from_secs(refresh_ttl.unsigned_abs()),
            )
            .await
            .map_err(index_unavailable)?;

        if !admission.evicted.is_empty() {
            tracing::info!(evicted = ?admission.evicted, "Device cap reached, evicted least recent");
        }

        let record = UpsertDeviceSession {
            identity_id: identity_id.to_string(),
            device_id: ctx.device_id.clone(),
            token_hash: refresh_hash,
            issued_at: to_timestamp(refresh.claims.iat)?,
            expires_at: to_timestamp(refresh.claims.exp)?,
            user_agent: ctx.user_agent.clone(),
            ip_address: ctx.ip_address.clone(),
        };
        self.ledger
            .upsert_device_session(&record)
            .await
            .map_err(ledger_unavailable)?;

        for evicted in &admission.evicted {
            self.ledger
                .revoke_device(identity_id, evicted)
                .await
                .map_err(ledger_unavailable)?;
        }

        tracing::debug!(already_member = admission.already_member, "Login admitted");
        Ok(IssuedCredentials {
            access_token: access.token,
            refresh_token: refresh.token,
        })
    }

    /// Resolve (or create) the internal identity for a federated subject and
    /// log it in.
    #[tracing::instrument(skip_all, fields(provider = %claims.provider, device_id = %ctx.device_id))]
    pub async fn federated_login(
        &self,
        claims: &FederatedClaims,
        ctx: &LoginContext,
    ) -> Result<IssuedCredentials, CoreError> {
        if claims.provider.is_empty() || claims.subject.is_empty() {
            return Err(CoreError::Validation(
                "provider and subject must not be empty".into(),
            ));
        }

        let existing = self
            .ledger
            .find_identity_by_provider(&claims.provider, &claims.subject)
            .await
            .map_err(ledger_unavailable)?;

        let identity = match existing {
            Some(identity) => identity,
            None => {
                let input = CreateIdentity {
                    identity_id: uuid::Uuid::new_v4().to_string(),
                    provider: Some(claims.provider.clone()),
                    provider_subject: Some(claims.subject.clone()),
                    email: claims.email.clone(),
                };
                let identity = self
                    .ledger
                    .create_identity(&input)
                    .await
                    .map_err(ledger_unavailable)?;
                tracing::info!(identity_id = %identity.identity_id, "Federated identity linked");
                identity
            }
        };

        self.login(&identity.identity_id, ctx).await
    }

    /// Exchange a live refresh credential for a new access credential. The
    /// refresh credential itself is not rotated, but only the one issued by
    /// the device's latest login is accepted.
    #[tracing::instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedAccess, CoreError> {
        let claims = self
            .codec
            .verify_kind(refresh_token, CredentialKind::Refresh)?;
        let stored = self
            .index
            .refresh_hash(&claims.user_id, &claims.device_id)
            .await
            .map_err(index_unavailable)?;
        if stored.as_deref() != Some(hash_credential(refresh_token).as_str()) {
            return Err(CoreError::SessionNotLive);
        }

        self.ledger
            .touch_last_used(&claims.user_id, &claims.device_id)
            .await
            .map_err(ledger_unavailable)?;

        let access = self.codec.mint(
            CredentialKind::Access,
            &claims.user_id,
            &claims.device_id,
            self.lifetimes.access_ttl_secs,
        )?;
        tracing::debug!(identity_id = %claims.user_id, device_id = %claims.device_id, "Access refreshed");
        Ok(RefreshedAccess {
            access_token: access.token,
        })
    }

    /// Revoke the device named by the access credential.
    #[tracing::instrument(skip_all)]
    pub async fn logout(&self, access_token: &str) -> Result<(), CoreError> {
        let claims = self.codec.verify_kind(access_token, CredentialKind::Access)?;
        self.revoke_in_both(&claims.user_id, &claims.device_id).await?;
        tracing::info!(identity_id = %claims.user_id, device_id = %claims.device_id, "Logged out");
        Ok(())
    }

    /// Revoke every device of the identity named by the access credential.
    #[tracing::instrument(skip_all)]
    pub async fn logout_all(&self, access_token: &str) -> Result<(), CoreError> {
        let claims = self.codec.verify_kind(access_token, CredentialKind::Access)?;

        let removed = self
            .index
            .revoke_all(&claims.user_id)
            .await
            .map_err(index_unavailable)?;
        let revoked = self
            .ledger
            .revoke_all_devices(&claims.user_id)
            .await
            .map_err(ledger_unavailable)?;

        tracing::info!(
            identity_id = %claims.user_id,
            index_devices = removed.len(),
            ledger_rows = revoked,
            "Logged out everywhere"
        );
        Ok(())
    }

    /// A session is live only when the access credential verifies and the
    /// device still has a refresh entry in the index.
    #[tracing::instrument(skip_all)]
    pub async fn verify(&self, access_token: &str) -> Result<SessionInfo, CoreError> {
        let claims = self.codec.verify_kind(access_token, CredentialKind::Access)?;
        self.ensure_live(&claims).await?;
        Ok(SessionInfo {
            identity_id: claims.user_id,
            device_id: claims.device_id,
            expires_at: claims.exp,
        })
    }

    /// Ledger view of the caller's devices, newest issuance first.
    #[tracing::instrument(skip_all)]
    pub async fn list_devices(&self, access_token: &str) -> Result<Vec<DeviceSummary>, CoreError> {
        let session = self.verify(access_token).await?;
        let rows = self
            .ledger
            .list_devices(&session.identity_id)
            .await
            .map_err(ledger_unavailable)?;

        Ok(rows
            .into_iter()
            .map(|row| DeviceSummary {
                current: row.device_id == session.device_id,
                device_id: row.device_id,
                issued_at: row.issued_at,
                expires_at: row.expires_at,
                last_used_at: row.last_used_at,
                user_agent: row.user_agent,
                ip_address: row.ip_address,
                revoked: row.revoked,
            })
            .collect())
    }

    /// Revoke one device of the caller's identity. Idempotent.
    #[tracing::instrument(skip_all, fields(target_device = %device_id))]
    pub async fn revoke_device(&self, access_token: &str, device_id: &str) -> Result<(), CoreError> {
        if device_id.is_empty() {
            return Err(CoreError::Validation("device id must not be empty".into()));
        }
        let session = self.verify(access_token).await?;
        self.revoke_in_both(&session.identity_id, device_id).await?;
        tracing::info!(identity_id = %session.identity_id, "Device revoked");
        Ok(())
    }

    async fn ensure_live(&self, claims: &Claims) -> Result<(), CoreError> {
        let live = self
            .index
            .exists(&claims.user_id, &claims.device_id)
            .await
            .map_err(index_unavailable)?;
        if live {
            Ok(())
        } else {
            Err(CoreError::SessionNotLive)
        }
    }

    async fn revoke_in_both(&self, identity_id: &str, device_id: &str) -> Result<(), CoreError> {
        self.index
            .revoke_device(identity_id, device_id)
            .await
            .map_err(index_unavailable)?;
        self.ledger
            .revoke_device(identity_id, device_id)
            .await
            .map_err(ledger_unavailable)?;
        Ok(())
    }
}

fn index_unavailable(err: IndexError) -> CoreError {
    tracing::error!(error = %err, store = INDEX_STORE, "Session index call failed");
    CoreError::StoreUnavailable { store: INDEX_STORE }
}

fn ledger_unavailable(err: LedgerError) -> CoreError {
    tracing::error!(error = %err, store = LEDGER_STORE, "Session ledger call failed");
    CoreError::StoreUnavailable {
        store: LEDGER_STORE,
    }
}

fn to_timestamp(secs: i64) -> Result<Timestamp, CoreError> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| CoreError::Validation(format!("timestamp {secs} out of range")))
}
