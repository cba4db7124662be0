//! Fast session index.
//!
//! Per identity the index keeps an ordered roster of admitted devices (by
//! last activity, capped by an [`AdmissionPolicy`](warden_core::admission::AdmissionPolicy))
//! and one TTL'd refresh-credential fingerprint per device. A device session
//! is live exactly while its fingerprint entry exists.
//!
//! Every operation is atomic on its own: a concurrent pair of calls for one
//! identity leaves the index in a state reachable by running them in some
//! order, and dropping the calling future never leaves an eviction applied
//! without the matching admission.

use std::time::Duration;

use async_trait::async_trait;
use warden_core::types::DeviceId;

pub mod memory;
pub mod redis_index;

pub use self::memory::MemorySessionIndex;
pub use self::redis_index::RedisSessionIndex;

/// Failure of a session index call.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Session index unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of [`SessionIndex::admit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Admission {
    /// Devices removed to make room, least recent first.
    pub evicted: Vec<DeviceId>,
    /// The device was already admitted; only its recency and TTL changed.
    pub already_member: bool,
}

#[async_trait]
pub trait SessionIndex: Send + Sync {
    /// Admit `device_id`, evicting the least recent device when the roster is
    /// full, and store the refresh fingerprint with the given TTL.
    async fn admit(
        &self,
        identity_id: &str,
        device_id: &str,
        refresh_hash: &str,
        ttl: Duration,
    ) -> Result<Admission, IndexError>;

    /// Whether a non-expired refresh entry exists for the device. Existence
    /// only; it says nothing about which credential was stored.
    async fn exists(&self, identity_id: &str, device_id: &str) -> Result<bool, IndexError>;

    /// Fingerprint stored by the device's latest admission, if still live.
    async fn refresh_hash(
        &self,
        identity_id: &str,
        device_id: &str,
    ) -> Result<Option<String>, IndexError>;

    /// Remove the device's refresh entry and roster membership. Idempotent.
    async fn revoke_device(&self, identity_id: &str, device_id: &str) -> Result<(), IndexError>;

    /// Remove every device of the identity. Returns the devices that were
    /// members. Idempotent.
    async fn revoke_all(&self, identity_id: &str) -> Result<Vec<DeviceId>, IndexError>;

    /// Current roster, least recently active first.
    async fn devices(&self, identity_id: &str) -> Result<Vec<DeviceId>, IndexError>;
}
