//! In-memory ledger with the same semantics as the PostgreSQL one.
//!
//! Used by lifecycle tests and by development runs without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::ledger::{LedgerError, SessionLedger};
use crate::models::device_session::{DeviceSession, UpsertDeviceSession};
use crate::models::identity::{CreateIdentity, Identity};

#[derive(Default)]
struct LedgerState {
    identities: HashMap<String, Identity>,
    sessions: HashMap<(String, String), DeviceSession>,
}

/// Process-local [`SessionLedger`].
#[derive(Default)]
pub struct MemoryLedger {
    state: RwLock<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up one device session row, revoked or not.
    pub async fn device_session(&self, identity_id: &str, device_id: &str) -> Option<DeviceSession> {
        let state = self.state.read().await;
        state
            .sessions
            .get(&(identity_id.to_string(), device_id.to_string()))
            .cloned()
    }

    pub async fn identity_count(&self) -> usize {
        self.state.read().await.identities.len()
    }
}

fn find_by_provider<'a>(
    state: &'a LedgerState,
    provider: &str,
    subject: &str,
) -> Option<&'a Identity> {
    state.identities.values().find(|identity| {
        identity.provider.as_deref() == Some(provider)
            && identity.provider_subject.as_deref() == Some(subject)
    })
}

#[async_trait]
impl SessionLedger for MemoryLedger {
    async fn find_identity_by_provider(
        &self,
        provider: &str,
        subject: &str,
    ) -> Result<Option<Identity>, LedgerError> {
        let state = self.state.read().await;
        Ok(find_by_provider(&state, provider, subject).cloned())
    }

    async fn create_identity(&self, input: &CreateIdentity) -> Result<Identity, LedgerError> {
        let mut state = self.state.write().await;

        if let (Some(provider), Some(subject)) = (&input.provider, &input.provider_subject) {
            if let Some(existing) = find_by_provider(&state, provider, subject) {
                return Ok(existing.clone());
            }
        }

        let identity = state
            .identities
            .entry(input.identity_id.clone())
            .or_insert_with(|| Identity {
                identity_id: input.identity_id.clone(),
                provider: input.provider.clone(),
                provider_subject: input.provider_subject.clone(),
                email: input.email.clone(),
                created_at: Utc::now(),
            });
        Ok(identity.clone())
    }

    async fn upsert_device_session(
        &self,
        input: &UpsertDeviceSession,
    ) -> Result<DeviceSession, LedgerError> {
        let session = DeviceSession {
            identity_id: input.identity_id.clone(),
            device_id: input.device_id.clone(),
            token_hash: input.token_hash.clone(),
            issued_at: input.issued_at,
            expires_at: input.expires_at,
            last_used_at: None,
            user_agent: input.user_agent.clone(),
            ip_address: input.ip_address.clone(),
            revoked: false,
        };
        let mut state = self.state.write().await;
        state.sessions.insert(
            (input.identity_id.clone(), input.device_id.clone()),
            session.clone(),
        );
        Ok(session)
    }

    async fn touch_last_used(
        &self,
        identity_id: &str,
        device_id: &str,
    ) -> Result<bool, LedgerError> {
        let mut state = self.state.write().await;
        match state
            .sessions
            .get_mut(&(identity_id.to_string(), device_id.to_string()))
        {
            Some(session) if !session.revoked => {
                session.last_used_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_device(&self, identity_id: &str, device_id: &str) -> Result<bool, LedgerError> {
        let mut state = self.state.write().await;
        match state
            .sessions
            .get_mut(&(identity_id.to_string(), device_id.to_string()))
        {
            Some(session) if !session.revoked => {
                session.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_devices(&self, identity_id: &str) -> Result<u64, LedgerError> {
        let mut state = self.state.write().await;
        let mut revoked = 0;
        for session in state
            .sessions
            .values_mut()
            .filter(|s| s.identity_id == identity_id && !s.revoked)
        {
            session.revoked = true;
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn list_devices(&self, identity_id: &str) -> Result<Vec<DeviceSession>, LedgerError> {
        let state = self.state.read().await;
        let mut devices: Vec<DeviceSession> = state
            .sessions
            .values()
            .filter(|s| s.identity_id == identity_id)
            .cloned()
            .collect();
        devices.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(devices)
    }

    async fn count_active_devices(&self, identity_id: &str) -> Result<i64, LedgerError> {
        let now = Utc::now();
        let state = self.state.read().await;
        let count = state
            .sessions
            .values()
            .filter(|s| s.identity_id == identity_id && s.is_active_at(now))
            .count();
        Ok(count as i64)
    }
}
