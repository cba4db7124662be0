//! Process-local session index.
//!
//! A single async mutex guards all state and no operation awaits while
//! holding it, so each call applies completely or not at all even when the
//! calling task is cancelled.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use warden_core::admission::{AdmissionDecision, AdmissionPolicy};
use warden_core::types::{DeviceId, IdentityId};

use super::{Admission, IndexError, SessionIndex};

/// Admissions between sweeps of expired rosters and refresh entries.
const PURGE_INTERVAL: u64 = 256;

/// Last-activity instant plus an admission sequence number, so devices
/// admitted within the same instant still order by admission.
type Recency = (Instant, u64);

struct Roster {
    members: HashMap<DeviceId, Recency>,
    expires_at: Instant,
}

struct RefreshEntry {
    hash: String,
    expires_at: Instant,
}

#[derive(Default)]
struct IndexState {
    rosters: HashMap<IdentityId, Roster>,
    refresh: HashMap<(IdentityId, DeviceId), RefreshEntry>,
    sequence: u64,
}

impl IndexState {
    /// The identity's roster, dropping it first if it has expired.
    fn live_roster(&mut self, identity_id: &str, now: Instant) -> Option<&mut Roster> {
        if self
            .rosters
            .get(identity_id)
            .is_some_and(|roster| roster.expires_at <= now)
        {
            self.rosters.remove(identity_id);
        }
        self.rosters.get_mut(identity_id)
    }

    /// Drop every expired roster and refresh entry, including those of
    /// identities that are never touched again.
    fn purge_expired(&mut self, now: Instant) {
        self.rosters.retain(|_, roster| roster.expires_at > now);
        self.refresh.retain(|_, entry| entry.expires_at > now);
    }
}

/// In-memory [`SessionIndex`] with the same semantics as the Redis one.
pub struct MemorySessionIndex {
    policy: AdmissionPolicy,
    state: Mutex<IndexState>,
}

impl MemorySessionIndex {
    pub fn new(policy: AdmissionPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(IndexState::default()),
        }
    }
}

impl Default for MemorySessionIndex {
    fn default() -> Self {
        Self::new(AdmissionPolicy::default())
    }
}

fn key(identity_id: &str, device_id: &str) -> (IdentityId, DeviceId) {
    (identity_id.to_string(), device_id.to_string())
}

#[async_trait]
impl SessionIndex for MemorySessionIndex {
    async fn admit(
        &self,
        identity_id: &str,
        device_id: &str,
        refresh_hash: &str,
        ttl: Duration,
    ) -> Result<Admission, IndexError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| IndexError::Unavailable(format!("ttl of {ttl:?} out of range")))?;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.sequence += 1;
        if state.sequence % PURGE_INTERVAL == 0 {
            state.purge_expired(now);
        }
        let recency = (now, state.sequence);

        if state.live_roster(identity_id, now).is_none() {
            state.rosters.insert(
                identity_id.to_string(),
                Roster {
                    members: HashMap::new(),
                    expires_at,
                },
            );
        }
        let roster = state
            .rosters
            .get_mut(identity_id)
            .ok_or_else(|| IndexError::Unavailable("roster vanished during admission".into()))?;

        let decision = self.policy.decide(&roster.members, device_id);
        for evicted in decision.evicted() {
            roster.members.remove(evicted);
            state.refresh.remove(&key(identity_id, evicted));
        }

        roster.members.insert(device_id.to_string(), recency);
        if roster.expires_at < expires_at {
            roster.expires_at = expires_at;
        }
        state.refresh.insert(
            key(identity_id, device_id),
            RefreshEntry {
                hash: refresh_hash.to_string(),
                expires_at,
            },
        );

        Ok(Admission {
            already_member: decision == AdmissionDecision::Existing,
            evicted: decision.evicted().to_vec(),
        })
    }

    async fn exists(&self, identity_id: &str, device_id: &str) -> Result<bool, IndexError> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        let entry_key = key(identity_id, device_id);
        match state.refresh.get(&entry_key).map(|e| e.expires_at > now) {
            Some(true) => Ok(true),
            Some(false) => {
                state.refresh.remove(&entry_key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn refresh_hash(
        &self,
        identity_id: &str,
        device_id: &str,
    ) -> Result<Option<String>, IndexError> {
        let now = Instant::now();
        let state = self.state.lock().await;
        Ok(state
            .refresh
            .get(&key(identity_id, device_id))
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.hash.clone()))
    }

    async fn revoke_device(&self, identity_id: &str, device_id: &str) -> Result<(), IndexError> {
        let mut state = self.state.lock().await;
        state.refresh.remove(&key(identity_id, device_id));
        if let Some(roster) = state.rosters.get_mut(identity_id) {
            roster.members.remove(device_id);
        }
        Ok(())
    }

    async fn revoke_all(&self, identity_id: &str) -> Result<Vec<DeviceId>, IndexError> {
        let mut state = self.state.lock().await;
        let Some(roster) = state.rosters.remove(identity_id) else {
            return Ok(Vec::new());
        };
        let devices: Vec<DeviceId> = roster.members.into_keys().collect();
        for device_id in &devices {
            state.refresh.remove(&key(identity_id, device_id));
        }
        Ok(devices)
    }

    async fn devices(&self, identity_id: &str) -> Result<Vec<DeviceId>, IndexError> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        let Some(roster) = state.live_roster(identity_id, now) else {
            return Ok(Vec::new());
        };
        let mut members: Vec<(&DeviceId, &Recency)> = roster.members.iter().collect();
        members.sort_by(|a, b| a.1.cmp(b.1));
        Ok(members.into_iter().map(|(device, _)| device.clone()).collect())
    }
}
